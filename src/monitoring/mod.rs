/*!
 * Monitoring
 * Structured logging setup and disposal spans
 */

mod tracer;

pub use tracer::{init_tracing, DisposalSpan};
