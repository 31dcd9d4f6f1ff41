pub mod availability; // Free-hour fetch with fencing tokens
pub mod backend; // Record-storage collaborator: REST + in-memory
pub mod config;
pub mod context; // Caller identity and role capabilities
pub mod error;
pub mod form; // Mountable composition surface
pub mod lifecycle; // Create / update / status / delete + mirror
pub mod models;
pub mod notice;
pub mod pricing; // Weight-tier price resolution
pub mod selection; // Dependent-field reducer

pub use backend::{HttpBackend, InMemoryBackend, SchedulingBackend};
pub use context::CallerContext;
pub use error::{BackendError, SchedulingError, ValidationError};
pub use form::{AppointmentForm, FormMode, SubmitOutcome};
pub use lifecycle::AppointmentManager;
pub use pricing::{resolve_price, DisplayPrice};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let initialized = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
