pub(crate) mod fixtures;

mod scenario_tests;
