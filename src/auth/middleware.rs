use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{FromRequest, HttpMessage};
use actix_web_flash_messages::FlashMessage;
use chrono::Utc;

use crate::session::TypedSession;
use crate::utils::{e500, see_other};

/// Let requests through only when the session holds an unexpired login.
///
/// The `SessionUser` is made available to handlers as `web::ReqData<SessionUser>`.
pub async fn reject_anonymous_users(
    mut req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let session = {
        let (http_request, payload) = req.parts_mut();
        TypedSession::from_request(http_request, payload).await
    }?;

    match session.get_user().map_err(e500)? {
        Some(user) if !user.is_expired(Utc::now()) => {
            req.extensions_mut().insert(user);
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Some(user) => {
            tracing::info!(account_id = %user.account_id, "Session expired");
            session.log_out();
            FlashMessage::info("Your session has expired. Please log in again.").send();
            Ok(req.into_response(see_other("/login")).map_into_right_body())
        }
        None => Ok(req.into_response(see_other("/login")).map_into_right_body()),
    }
}
