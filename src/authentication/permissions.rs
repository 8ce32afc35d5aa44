use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (UserRole::User, &[ActionType::ManageOwnRecipes]),
    (
        UserRole::Admin,
        &[
            ActionType::ManageOwnRecipes,
            ActionType::ManageAllRecipes,
            ActionType::ManageCatalogue,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    ManageOwnRecipes,

    ManageAllRecipes,
    ManageCatalogue,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let role = &session.role;

        ACTION_TABLE
            .iter()
            .find_map(|(r, actions)| {
                if role != r {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: "cook".to_owned(),
            role,
        }
    }

    #[test]
    fn only_admins_manage_everything() {
        let user = session(UserRole::User);
        let admin = session(UserRole::Admin);

        assert!(ActionType::ManageOwnRecipes.authenticate(&user));
        assert!(!ActionType::ManageAllRecipes.authenticate(&user));
        assert!(!ActionType::ManageCatalogue.authenticate(&user));
        assert!(ActionType::ManageAllRecipes.authenticate(&admin));
        assert!(ActionType::ManageCatalogue.authenticate(&admin));
        assert!(admin.is_admin());
        assert!(!user.is_admin());
    }
}
