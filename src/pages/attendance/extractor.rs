use std::ops::Deref;

use super::*;

/// Attendance that is still open for edits
pub(super) struct UnpaidAttendance(pub(super) attendance::Model);

impl Deref for UnpaidAttendance {
    type Target = attendance::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for UnpaidAttendance {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let attendance = attendance::Model::from_request(&req, &mut dev::Payload::None).await?;

            ledger::ensure_unpaid(&attendance)?;

            Ok(Self(attendance))
        })
    }
}
