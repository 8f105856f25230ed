use poise::serenity_prelude as serenity;

/// Effective guild permissions of a member plus the roles they hold.
#[derive(Clone, Debug)]
pub struct MemberAccess {
    pub permissions: serenity::Permissions,
    pub role_ids: Vec<u64>,
    pub is_owner: bool,
}

impl MemberAccess {
    /// Whether this member may run a moderation command needing `required`.
    ///
    /// Guild owners, `ADMINISTRATOR` holders and members with a configured
    /// admin or moderator role always pass; everyone else needs `required`.
    pub fn allows(
        &self,
        required: serenity::Permissions,
        moderator_role_ids: &[u64],
        admin_role_ids: &[u64],
    ) -> bool {
        if self.is_owner || self.permissions.contains(serenity::Permissions::ADMINISTRATOR) {
            return true;
        }

        let has_role = |configured: &[u64]| {
            self.role_ids
                .iter()
                .any(|role_id| configured.contains(role_id))
        };
        if has_role(admin_role_ids) || has_role(moderator_role_ids) {
            return true;
        }

        self.permissions.contains(required)
    }
}

/// Resolve a member's effective guild permissions from role grants.
pub async fn resolve_member_access(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> anyhow::Result<MemberAccess> {
    let guild = guild_id.to_partial_guild(http).await?;
    let member = guild_id.member(http, user_id).await?;
    let role_ids = member.roles.iter().map(|role_id| role_id.get()).collect();

    if guild.owner_id == user_id {
        return Ok(MemberAccess {
            permissions: serenity::Permissions::all(),
            role_ids,
            is_owner: true,
        });
    }

    let everyone_role_id = serenity::RoleId::new(guild_id.get());
    let mut resolved = serenity::Permissions::empty();
    for role in guild.roles.values() {
        if role.id == everyone_role_id || member.roles.contains(&role.id) {
            resolved |= role.permissions;
        }
    }

    Ok(MemberAccess {
        permissions: resolved,
        role_ids,
        is_owner: false,
    })
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;

    use super::MemberAccess;

    fn member(permissions: serenity::Permissions, role_ids: Vec<u64>) -> MemberAccess {
        MemberAccess {
            permissions,
            role_ids,
            is_owner: false,
        }
    }

    #[test]
    fn native_permission_is_enough() {
        let access = member(serenity::Permissions::KICK_MEMBERS, vec![]);
        assert!(access.allows(serenity::Permissions::KICK_MEMBERS, &[], &[]));
        assert!(!access.allows(serenity::Permissions::BAN_MEMBERS, &[], &[]));
    }

    #[test]
    fn configured_roles_grant_access() {
        let access = member(serenity::Permissions::empty(), vec![7, 8]);
        assert!(access.allows(serenity::Permissions::BAN_MEMBERS, &[8], &[]));
        assert!(access.allows(serenity::Permissions::BAN_MEMBERS, &[], &[7]));
        assert!(!access.allows(serenity::Permissions::BAN_MEMBERS, &[9], &[10]));
    }

    #[test]
    fn administrators_and_owners_always_pass() {
        let admin = member(serenity::Permissions::ADMINISTRATOR, vec![]);
        assert!(admin.allows(serenity::Permissions::BAN_MEMBERS, &[], &[]));

        let owner = MemberAccess {
            is_owner: true,
            ..member(serenity::Permissions::empty(), vec![])
        };
        assert!(owner.allows(serenity::Permissions::BAN_MEMBERS, &[], &[]));
    }
}
