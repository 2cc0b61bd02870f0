use thiserror::Error;

use crate::identity::IdentityError;

/// Failures raised by the owner-scoped resource layer
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Ownership guard answered false: missing, soft-deleted, or owned by someone else
    #[error("{resource} is not eligible for this operation")]
    NotEligible { resource: &'static str },

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// The mutation predicate matched zero rows after the guard passed
    #[error("{resource} was not modified")]
    NoRowsAffected { resource: &'static str },

    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("At least one search field is required")]
    NoSearchCriteria,

    #[error("Duplicate value violates {constraint}")]
    Duplicate { constraint: String },

    #[error("Column '{column}' is not writable on {resource}")]
    InvalidColumn { resource: &'static str, column: String },

    #[error("Identity provider sync failed: {0}")]
    IdentitySync(#[from] IdentityError),

    #[error(transparent)]
    Infrastructure(sqlx::Error),
}

impl From<sqlx::Error> for ResourceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // unique_violation
            if db.code().as_deref() == Some("23505") {
                return ResourceError::Duplicate {
                    constraint: db.constraint().unwrap_or("unique constraint").to_string(),
                };
            }
        }
        ResourceError::Infrastructure(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_infrastructure() {
        let err = ResourceError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ResourceError::Infrastructure(_)));
    }

    #[test]
    fn messages_name_the_resource() {
        let err = ResourceError::NoRowsAffected { resource: "account" };
        assert_eq!(err.to_string(), "account was not modified");
    }
}
