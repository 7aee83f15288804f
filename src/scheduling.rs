use crate::{entity::sea_orm_active_enums::AppointmentStatus, error::ServiceError};

impl AppointmentStatus {
    /// Completed and cancelled appointments are closed for good
    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Status every appointment is created with
    pub fn initial() -> Self {
        AppointmentStatus::Active
    }

    /// System-driven transition, only `Active` can be completed or cancelled
    pub fn transition(self, to: AppointmentStatus) -> Result<AppointmentStatus, ServiceError> {
        match (self, to) {
            (AppointmentStatus::Active, AppointmentStatus::Completed | AppointmentStatus::Cancelled) => Ok(to),
            (from, to) => Err(ServiceError::InvalidTransition { from, to }),
        }
    }

    /// Direct edits may relabel an open appointment but never reopen a closed one
    ///
    /// Closing goes through [`AppointmentStatus::transition`] only
    pub fn edit(self, to: AppointmentStatus) -> Result<AppointmentStatus, ServiceError> {
        if self != to && (self.is_terminal() || to.is_terminal()) {
            return Err(ServiceError::InvalidTransition { from: self, to });
        }

        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Iterable as _;

    use super::*;

    #[test]
    fn test_transitions() {
        assert_eq!(AppointmentStatus::initial(), AppointmentStatus::Active);

        assert_eq!(AppointmentStatus::Active.transition(AppointmentStatus::Completed).unwrap(), AppointmentStatus::Completed);
        assert_eq!(AppointmentStatus::Active.transition(AppointmentStatus::Cancelled).unwrap(), AppointmentStatus::Cancelled);

        assert!(AppointmentStatus::Active.transition(AppointmentStatus::Confirmed).is_err());
        assert!(AppointmentStatus::Confirmed.transition(AppointmentStatus::Completed).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in [AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
            assert!(from.is_terminal());

            for to in AppointmentStatus::iter() {
                assert!(matches!(from.transition(to), Err(ServiceError::InvalidTransition { .. })));
            }

            assert!(from.edit(AppointmentStatus::Active).is_err());
            assert_eq!(from.edit(from).unwrap(), from);
        }
    }

    #[test]
    fn test_direct_edit_reaches_labels() {
        assert_eq!(AppointmentStatus::Active.edit(AppointmentStatus::Confirmed).unwrap(), AppointmentStatus::Confirmed);
        assert_eq!(AppointmentStatus::Confirmed.edit(AppointmentStatus::Rescheduled).unwrap(), AppointmentStatus::Rescheduled);
        assert_eq!(AppointmentStatus::Rescheduled.edit(AppointmentStatus::Active).unwrap(), AppointmentStatus::Active);

        assert!(matches!(
            AppointmentStatus::Confirmed.edit(AppointmentStatus::Completed),
            Err(ServiceError::InvalidTransition { from: AppointmentStatus::Confirmed, to: AppointmentStatus::Completed })
        ));
        assert!(AppointmentStatus::Rescheduled.edit(AppointmentStatus::Cancelled).is_err());
        assert!(AppointmentStatus::Active.edit(AppointmentStatus::Completed).is_err());
    }
}
