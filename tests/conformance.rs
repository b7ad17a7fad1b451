use mind_runtime::conformance::run_parity_suite;

// The suite resets the default session between cases, so it owns this
// binary: keep it as the single test here.
#[test]
fn backend_parity_suite_passes() {
    run_parity_suite(42).expect("backend parity suite should pass");
}
