use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_identitystore::types::MemberId;
use tracing::{error, warn};

use super::{
    Assignment, AttachedManagedPolicy, CustomerManagedPolicy, GroupDetails, IdentityCenter,
    Member, PermissionSetDetails, PolicyBundle, PrincipalType,
};
use crate::session::SsoSession;

const CUSTOMER_MANAGED_NOTE: &str =
    "Policy document not retrieved - requires target account access";

#[async_trait]
impl IdentityCenter for SsoSession {
    async fn provisioned_permission_sets(&self, account_id: &str) -> Result<Vec<String>> {
        let mut permission_sets = Vec::new();
        let mut pages = self
            .sso_admin()
            .list_permission_sets_provisioned_to_account()
            .instance_arn(self.instance_arn())
            .account_id(account_id)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.context("list_permission_sets_provisioned_to_account")?;
            permission_sets.extend(page.permission_sets().iter().cloned());
        }
        Ok(permission_sets)
    }

    async fn account_assignments(
        &self,
        account_id: &str,
        permission_set_arn: &str,
    ) -> Result<Vec<Assignment>> {
        let mut assignments = Vec::new();
        let mut pages = self
            .sso_admin()
            .list_account_assignments()
            .instance_arn(self.instance_arn())
            .account_id(account_id)
            .permission_set_arn(permission_set_arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.context("list_account_assignments")?;
            for assignment in page.account_assignments() {
                let principal_type = match assignment.principal_type().map(|t| t.as_str()) {
                    Some("GROUP") => PrincipalType::Group,
                    Some("USER") => PrincipalType::User,
                    other => {
                        warn!("Skipping assignment with unsupported principal type {other:?}");
                        continue;
                    }
                };
                let (Some(principal_id), Some(arn)) =
                    (assignment.principal_id(), assignment.permission_set_arn())
                else {
                    warn!("Skipping assignment with missing principal or permission set");
                    continue;
                };
                assignments.push(Assignment {
                    principal_type,
                    principal_id: principal_id.to_string(),
                    permission_set_arn: arn.to_string(),
                });
            }
        }
        Ok(assignments)
    }

    async fn group_details(&self, group_id: &str) -> Result<GroupDetails> {
        let out = self
            .identity_store()
            .describe_group()
            .identity_store_id(self.identity_store_id())
            .group_id(group_id)
            .send()
            .await
            .context("describe_group")?;
        Ok(GroupDetails {
            group_id: out.group_id().to_string(),
            display_name: out.display_name().unwrap_or_default().to_string(),
            description: out.description().unwrap_or_default().to_string(),
        })
    }

    async fn group_member_ids(&self, group_id: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut pages = self
            .identity_store()
            .list_group_memberships()
            .identity_store_id(self.identity_store_id())
            .group_id(group_id)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.context("list_group_memberships")?;
            for membership in page.group_memberships() {
                match membership.member_id() {
                    Some(MemberId::UserId(user_id)) => ids.push(user_id.clone()),
                    other => {
                        warn!("Skipping group membership with unsupported member id {other:?}")
                    }
                }
            }
        }
        Ok(ids)
    }

    async fn user_details(&self, user_id: &str) -> Result<Member> {
        let out = self
            .identity_store()
            .describe_user()
            .identity_store_id(self.identity_store_id())
            .user_id(user_id)
            .send()
            .await
            .context("describe_user")?;
        let user_name = out.user_name().unwrap_or_default().to_string();
        let display_name =
            out.display_name().map(str::to_string).unwrap_or_else(|| user_name.clone());
        let email =
            out.emails().first().and_then(|e| e.value()).unwrap_or_default().to_string();
        Ok(Member { user_id: out.user_id().to_string(), user_name, display_name, email })
    }

    async fn permission_set_details(
        &self,
        permission_set_arn: &str,
    ) -> Result<PermissionSetDetails> {
        let out = self
            .sso_admin()
            .describe_permission_set()
            .instance_arn(self.instance_arn())
            .permission_set_arn(permission_set_arn)
            .send()
            .await
            .context("describe_permission_set")?;
        let ps = out.permission_set().context("response is missing the permission set")?;
        Ok(PermissionSetDetails {
            permission_set_arn: ps.permission_set_arn().map(str::to_string),
            name: ps.name().map(str::to_string),
            description: ps.description().map(str::to_string),
            session_duration: ps.session_duration().map(str::to_string),
            relay_state: ps.relay_state().map(str::to_string),
            created_date: ps.created_date().map(|d| d.to_string()),
        })
    }

    /// Collects managed, customer-managed, and inline policies. Each stage
    /// degrades independently: a failure is logged and whatever has been
    /// gathered so far is returned.
    async fn permission_set_policies(&self, permission_set_arn: &str) -> Result<PolicyBundle> {
        let mut bundle = PolicyBundle::default();

        let mut pages = self
            .sso_admin()
            .list_managed_policies_in_permission_set()
            .instance_arn(self.instance_arn())
            .permission_set_arn(permission_set_arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            match page {
                Ok(page) => {
                    for policy in page.attached_managed_policies() {
                        bundle.managed_policies.push(AttachedManagedPolicy {
                            name: policy.name().map(str::to_string),
                            arn: policy.arn().map(str::to_string),
                        });
                    }
                }
                Err(err) => {
                    error!(
                        "Error listing managed policies for permission set \
                         {permission_set_arn}: {err}"
                    );
                    return Ok(bundle);
                }
            }
        }

        let mut pages = self
            .sso_admin()
            .list_customer_managed_policy_references_in_permission_set()
            .instance_arn(self.instance_arn())
            .permission_set_arn(permission_set_arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            match page {
                Ok(page) => {
                    for policy_ref in page.customer_managed_policy_references() {
                        bundle.customer_managed_policies.push(CustomerManagedPolicy {
                            name: policy_ref.name().to_string(),
                            path: policy_ref.path().unwrap_or("/").to_string(),
                            kind: "CustomerManaged".to_string(),
                            note: CUSTOMER_MANAGED_NOTE.to_string(),
                        });
                    }
                }
                Err(err) => {
                    error!(
                        "Error listing customer managed policies for permission set \
                         {permission_set_arn}: {err}"
                    );
                    return Ok(bundle);
                }
            }
        }

        match self
            .sso_admin()
            .get_inline_policy_for_permission_set()
            .instance_arn(self.instance_arn())
            .permission_set_arn(permission_set_arn)
            .send()
            .await
        {
            Ok(out) => {
                if let Some(document) = out.inline_policy() {
                    if !document.is_empty() {
                        match serde_json::from_str(document) {
                            Ok(value) => bundle.inline_policy = Some(value),
                            Err(err) => error!(
                                "Error parsing inline policy for permission set \
                                 {permission_set_arn}: {err}"
                            ),
                        }
                    }
                }
            }
            // No inline policy attached.
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) => {}
            Err(err) => {
                error!(
                    "Error getting inline policy for permission set {permission_set_arn}: {err}"
                );
            }
        }

        Ok(bundle)
    }
}
