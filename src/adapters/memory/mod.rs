//! In-memory adapters for tests and local runs.

mod report_repository;

pub use report_repository::InMemoryReportRepository;
