pub mod clock;
pub mod serde;
pub mod telemetry;

pub use self::clock::now_ms;
pub use self::serde::{Priority, TaskId};
pub use self::telemetry::{init_tracing, init_tracing_with_filter};
