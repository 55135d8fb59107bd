pub mod config_service;
pub mod dto;
pub(crate) mod http;
pub mod paths;
pub mod supabase_auth_client;
pub mod supabase_verse_repository;

pub use crate::config_service::{ConfigService, LectioConfig};
pub use crate::supabase_auth_client::SupabaseAuthClient;
pub use crate::supabase_verse_repository::SupabaseVerseRepository;
