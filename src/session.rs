use crate::types::mayday::UserId;

/// Identity context passed into every user-scoped operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<UserId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }
}
