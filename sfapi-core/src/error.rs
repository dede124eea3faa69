use crate::{
    aggregate::AggregateMutateError, crm::CrmError, envelope::EnvelopeError,
    session::SessionError, validate::ValidationFailure,
};

/// Every way a facade operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("Authentication failed: '{0}'")]
    Authentication(#[source] CrmError),
    #[error(transparent)]
    Crm(#[from] CrmError),
    #[error(transparent)]
    Mutate(#[from] AggregateMutateError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("The unit of work did not complete: '{0}'")]
    Aborted(String),
}

impl<E> From<SessionError<E>> for ServiceError
where
    E: Into<ServiceError>,
{
    fn from(err: SessionError<E>) -> Self {
        match err {
            SessionError::Authentication(err) => ServiceError::Authentication(err),
            SessionError::Work(err) => err.into(),
        }
    }
}
