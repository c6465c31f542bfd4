pub mod postgres_provider_repository;
pub mod postgres_request_repository;

pub use postgres_provider_repository::PostgresProviderRepository;
pub use postgres_request_repository::PostgresRequestRepository;
