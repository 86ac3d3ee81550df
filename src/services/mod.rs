pub mod intake_queue;
pub mod job_registry;
pub mod verification_service;
pub mod verification_worker;
