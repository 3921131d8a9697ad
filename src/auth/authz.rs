use crate::auth::session::Identity;
use crate::error::AppError;

/// Implemented by any resource row that belongs to exactly one user.
/// For rows owned through an intermediate table (a skill belongs to a
/// profile which belongs to a user) the query resolves the chain and the
/// row reports the end user id.
pub trait Owned {
    fn owner_id(&self) -> i32;
}

/// Ownership gate: runs between load and mutation, so a mismatch rejects
/// the whole operation before anything is written.
pub fn ensure_owner<T: Owned>(
    resource: &T,
    identity: &Identity,
    message: &str,
) -> Result<(), AppError> {
    if resource.owner_id() != identity.id {
        return Err(AppError::Forbidden(message.to_string()));
    }
    Ok(())
}
