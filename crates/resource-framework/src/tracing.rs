//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging for binaries built on the
//! framework.
//!
//! ## What Gets Traced
//!
//! - **Updates**: start and finish of every `up`, `refresh` and `destroy`, with a summary
//! - **Steps**: one `step{urn=...}` span per registered resource, with the chosen operation
//! - **Failures**: check failures, provider errors and dependency failures, with the URN
//!
//! ## Usage Examples
//!
//! ```bash
//! # Compact logs (default)
//! RUST_LOG=info cargo run -- up --stack dev
//!
//! # Resolved inputs for every step
//! RUST_LOG=debug cargo run -- up --stack dev
//!
//! # Only the engine
//! RUST_LOG=resource_framework=debug cargo run -- up --stack dev
//! ```
//!
//! ## Workflow Trace Example
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO Update started stack="dev" prior=0
//! INFO step: Step ok urn=urn:fixture:dev::fixture:ops:Add::0 + 2 op=create
//! INFO step: Step ok urn=urn:fixture:dev::fixture:ops:Div::(0 + 2) / 3 op=create
//! INFO step: Step ok urn=urn:fixture:dev::fixture:ops:Mul::0-result op=create
//! INFO Update finished stack="dev" size=3 summary=3 create
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // URNs already say where a line comes from
        .compact() // Compact format shows spans inline (e.g., "step: Step ok")
        .init();
}
