pub mod fixtures;

pub mod orchestrator_tests;
