//! Unit of work around endpoint dispatch

use crate::{auditing::AuditScope, server::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Open a unit of work, then complete it for responses below 400 and roll
/// it back otherwise
pub async fn unit_of_work(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let uow = state.unit_of_work.begin();
    let scope = req.extensions().get::<AuditScope>().cloned();
    req.extensions_mut().insert(uow.clone());

    let response = next.run(req).await;

    if response.status().as_u16() < 400 {
        let changes = uow.complete();
        if let Some(scope) = scope {
            scope.extend(changes);
        }
    } else {
        uow.rollback();
    }

    response
}
