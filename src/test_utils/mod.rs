//! Shared test utilities for jobhunt.

pub mod fixtures;
pub mod logging;

/// One row of a table-driven test.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
}

impl<I, E> TestCase<I, E> {
    pub const fn new(name: &'static str, input: I, expected: E) -> Self {
        Self {
            name,
            input,
            expected,
        }
    }
}

/// Run every case and report all mismatches at once.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F) -> Result<(), String>
where
    I: std::fmt::Debug + Clone,
    E: std::fmt::Debug + PartialEq,
    F: Fn(I) -> E,
{
    let mut failures = Vec::new();
    for case in cases {
        let start = std::time::Instant::now();
        let actual = test_fn(case.input.clone());
        println!("[TEST] {} ({:?})", case.name, start.elapsed());
        if actual != case.expected {
            failures.push(format!(
                "'{}': input {:?}, expected {:?}, got {:?}",
                case.name, case.input, case.expected, actual
            ));
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join("\n"))
    }
}
