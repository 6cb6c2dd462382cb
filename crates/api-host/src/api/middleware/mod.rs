//! Request pipeline middleware

mod audit;
mod auth;
mod correlation;
mod cors;
mod diagnostics;
mod enrichment;
mod localization;
mod uow;

pub use audit::audit_request;
pub use auth::{authenticate, authorize, bearer_token, TOKEN_EXPIRED_HEADER};
pub use correlation::{
    correlation_id, propagate_correlation_id, set_correlation_id, CORRELATION_ID_HEADER,
};
pub use cors::{cors_layer, origin_allowed, CorsOptions};
pub use diagnostics::developer_exception_page;
pub use enrichment::enrich_logs;
pub use localization::localize_request;
pub use uow::unit_of_work;
