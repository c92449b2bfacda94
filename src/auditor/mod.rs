use std::collections::{HashMap, HashSet};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    config::{Config, OutputFormat},
    sink::{NullSink, OutputSink},
};

mod aws;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("failed to audit account {account_id}: {source}")]
    Aggregation {
        account_id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Read-only view of the Identity Center directory consumed by the auditor.
///
/// The production implementation is the SDK-backed [`crate::session::SsoSession`];
/// tests substitute an in-memory directory.
#[async_trait]
pub trait IdentityCenter {
    /// ARNs of the permission sets provisioned to the given account.
    async fn provisioned_permission_sets(&self, account_id: &str) -> anyhow::Result<Vec<String>>;

    /// Assignments linking principals to one permission set in one account.
    async fn account_assignments(
        &self,
        account_id: &str,
        permission_set_arn: &str,
    ) -> anyhow::Result<Vec<Assignment>>;

    async fn group_details(&self, group_id: &str) -> anyhow::Result<GroupDetails>;

    /// User ids of the group's members, in provider order.
    async fn group_member_ids(&self, group_id: &str) -> anyhow::Result<Vec<String>>;

    async fn user_details(&self, user_id: &str) -> anyhow::Result<Member>;

    async fn permission_set_details(
        &self,
        permission_set_arn: &str,
    ) -> anyhow::Result<PermissionSetDetails>;

    async fn permission_set_policies(
        &self,
        permission_set_arn: &str,
    ) -> anyhow::Result<PolicyBundle>;
}

/// Principal kind of an account assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalType {
    #[serde(rename = "GROUP")]
    Group,
    #[serde(rename = "USER")]
    User,
}

/// One raw account-assignment record: principal × permission set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Assignment {
    pub principal_type: PrincipalType,
    pub principal_id: String,
    pub permission_set_arn: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupDetails {
    pub group_id: String,
    pub display_name: String,
    pub description: String,
}

/// A group member resolved to a user snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Member {
    pub user_id: String,
    pub user_name: String,
    pub display_name: String,
    pub email: String,
}

/// Permission-set attributes with the provider response envelope stripped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionSetDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_set_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedManagedPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

/// Customer-managed policy reference. Only name and path are available;
/// the policy document lives in the target account and is not fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerManagedPolicy {
    pub name: String,
    pub path: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub note: String,
}

/// Policies attached to one permission set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyBundle {
    pub managed_policies: Vec<AttachedManagedPolicy>,
    pub customer_managed_policies: Vec<CustomerManagedPolicy>,
    pub inline_policy: Option<serde_json::Value>,
}

/// A permission set as seen from a group: details plus policies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupPermissionSet {
    #[serde(flatten)]
    pub details: PermissionSetDetails,
    pub policies: PolicyBundle,
}

/// A group with its members and the permission sets assigned to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupRecord {
    #[serde(flatten)]
    pub details: GroupDetails,
    pub members: Vec<Member>,
    pub permission_sets: Vec<GroupPermissionSet>,
}

/// A permission set with its policies and the groups assigned to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionSetRecord {
    #[serde(flatten)]
    pub details: PermissionSetDetails,
    pub policies: PolicyBundle,
    pub assigned_groups: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoedConfig {
    pub aws_region: String,
    pub output_formats: Vec<OutputFormat>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub account_id: String,
    pub sso_instance_arn: String,
    pub identity_store_id: String,
    pub auditor_version: String,
    pub config: EchoedConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_groups: usize,
    pub total_permission_sets: usize,
    pub total_assignments: usize,
}

/// The complete audit snapshot for one account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub sso_groups_summary: Vec<String>,
    pub sso_permission_sets_summary: Vec<String>,
    pub sso_groups: Vec<GroupRecord>,
    pub permission_sets: Vec<PermissionSetRecord>,
    pub summary: Summary,
}

/// Aggregates Identity Center assignments for one account into a [`Report`].
///
/// One pass over the raw assignment sequence builds both the group-centric
/// and the permission-set-centric view, so assignments are enumerated only
/// once. All state lives in this value for the duration of a single run.
pub struct Auditor<'a, P: IdentityCenter> {
    provider: &'a P,
    config: &'a Config,
    instance_arn: String,
    identity_store_id: String,
    sink: &'a dyn OutputSink,
}

impl<'a, P: IdentityCenter> Auditor<'a, P> {
    pub fn new(
        provider: &'a P,
        config: &'a Config,
        instance_arn: impl Into<String>,
        identity_store_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            config,
            instance_arn: instance_arn.into(),
            identity_store_id: identity_store_id.into(),
            sink: &NullSink,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn OutputSink) -> Self {
        self.sink = sink;
        self
    }

    /// Performs the complete audit of Identity Center access for the account.
    ///
    /// Per-item lookup failures degrade to placeholder records and never
    /// abort the run; only a failure of the initial provisioned-permission-set
    /// listing surfaces as an [`AuditError`].
    pub async fn audit_account(&self, account_id: &str) -> Result<Report, AuditError> {
        info!("Starting Identity Center audit for account: {account_id}");
        self.sink.progress(&format!("Starting audit for account: {account_id}"));

        match self.collect(account_id).await {
            Ok(report) => {
                info!("Audit completed successfully for account {account_id}");
                Ok(report)
            }
            Err(source) => {
                error!("Audit failed for account {account_id}: {source:#}");
                Err(AuditError::Aggregation { account_id: account_id.to_string(), source })
            }
        }
    }

    async fn collect(&self, account_id: &str) -> anyhow::Result<Report> {
        self.sink.progress("Retrieving account assignments...");
        let assignments = self.all_account_assignments(account_id).await?;
        self.sink.debug_info(&format!("Found {} assignments", assignments.len()));

        let mut groups: Vec<GroupRecord> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut permission_sets: Vec<PermissionSetRecord> = Vec::new();
        let mut ps_index: HashMap<String, usize> = HashMap::new();
        let mut group_ps_seen: HashSet<(usize, String)> = HashSet::new();

        self.sink.progress("Processing assignments...");
        for assignment in &assignments {
            let ps_arn = &assignment.permission_set_arn;

            if assignment.principal_type == PrincipalType::Group
                && !group_index.contains_key(&assignment.principal_id)
            {
                let group_id = &assignment.principal_id;
                self.sink.progress(&format!("Processing group: {group_id}"));
                let details = self.resolve_group(group_id).await;
                let members = self.resolve_members(group_id).await;
                group_index.insert(group_id.clone(), groups.len());
                groups.push(GroupRecord { details, members, permission_sets: Vec::new() });
            }

            // Permission-set details and policies are fetched once per ARN
            // and shared by the group view and the permission-set view.
            if !ps_index.contains_key(ps_arn) {
                self.sink.progress(&format!("Processing permission set: {ps_arn}"));
                let details = self.resolve_permission_set(ps_arn).await;
                let policies = self.resolve_policies(ps_arn).await;
                ps_index.insert(ps_arn.clone(), permission_sets.len());
                permission_sets.push(PermissionSetRecord {
                    details,
                    policies,
                    assigned_groups: Vec::new(),
                });
            }
            let ps_pos = ps_index[ps_arn];

            if assignment.principal_type == PrincipalType::Group {
                let group_pos = group_index[&assignment.principal_id];

                // One entry per (group, permission set) pair even if the
                // provider returns the assignment more than once.
                if group_ps_seen.insert((group_pos, ps_arn.clone())) {
                    let record = &permission_sets[ps_pos];
                    groups[group_pos].permission_sets.push(GroupPermissionSet {
                        details: record.details.clone(),
                        policies: record.policies.clone(),
                    });
                }

                let record = &mut permission_sets[ps_pos];
                if !record.assigned_groups.contains(&assignment.principal_id) {
                    record.assigned_groups.push(assignment.principal_id.clone());
                }
            }
            // USER-type assignments count toward total_assignments but are
            // not materialized into a per-user collection.
        }

        let sso_groups_summary: Vec<String> =
            groups.iter().map(|g| g.details.display_name.clone()).collect();
        let sso_permission_sets_summary: Vec<String> = permission_sets
            .iter()
            .map(|ps| ps.details.name.clone().unwrap_or_else(|| "Unknown".to_string()))
            .collect();

        self.sink.progress("Finalizing audit results...");
        let summary = Summary {
            total_groups: groups.len(),
            total_permission_sets: permission_sets.len(),
            total_assignments: assignments.len(),
        };

        Ok(Report {
            metadata: ReportMetadata {
                generated_at: Local::now().to_rfc3339(),
                account_id: account_id.to_string(),
                sso_instance_arn: self.instance_arn.clone(),
                identity_store_id: self.identity_store_id.clone(),
                auditor_version: env!("CARGO_PKG_VERSION").to_string(),
                config: EchoedConfig {
                    aws_region: self.config.aws_region.clone(),
                    output_formats: self.config.output_formats.clone(),
                },
            },
            sso_groups_summary,
            sso_permission_sets_summary,
            sso_groups: groups,
            permission_sets,
            summary,
        })
    }

    /// Flat assignment sequence across every permission set provisioned to
    /// the account, in provider-return order.
    async fn all_account_assignments(&self, account_id: &str) -> anyhow::Result<Vec<Assignment>> {
        let provisioned = self
            .provider
            .provisioned_permission_sets(account_id)
            .await
            .with_context(|| {
                format!("listing permission sets provisioned to account {account_id}")
            })?;
        info!(
            "Found {} permission sets provisioned to account {}",
            provisioned.len(),
            account_id
        );

        let mut assignments = Vec::new();
        for ps_arn in &provisioned {
            match self.provider.account_assignments(account_id, ps_arn).await {
                Ok(mut batch) => assignments.append(&mut batch),
                Err(err) => {
                    error!(
                        "Error getting account assignments for permission set {ps_arn}: {err:#}"
                    );
                    self.sink.warning(&format!("Skipping permission set {ps_arn}: {err}"));
                }
            }
        }
        info!("Found {} total assignments for account {}", assignments.len(), account_id);
        Ok(assignments)
    }

    async fn resolve_group(&self, group_id: &str) -> GroupDetails {
        self.provider.group_details(group_id).await.unwrap_or_else(|err| {
            error!("Error getting group details for {group_id}: {err:#}");
            GroupDetails {
                group_id: group_id.to_string(),
                display_name: "Unknown".to_string(),
                description: String::new(),
            }
        })
    }

    async fn resolve_members(&self, group_id: &str) -> Vec<Member> {
        let member_ids = match self.provider.group_member_ids(group_id).await {
            Ok(ids) => ids,
            Err(err) => {
                error!("Error getting group members for {group_id}: {err:#}");
                return Vec::new();
            }
        };

        let mut members = Vec::with_capacity(member_ids.len());
        for user_id in member_ids {
            let member = self.provider.user_details(&user_id).await.unwrap_or_else(|err| {
                error!("Error getting user details for {user_id}: {err:#}");
                Member {
                    user_id: user_id.clone(),
                    user_name: "Unknown".to_string(),
                    display_name: "Unknown".to_string(),
                    email: String::new(),
                }
            });
            members.push(member);
        }
        members
    }

    async fn resolve_permission_set(&self, permission_set_arn: &str) -> PermissionSetDetails {
        self.provider.permission_set_details(permission_set_arn).await.unwrap_or_else(|err| {
            error!("Error getting permission set details for {permission_set_arn}: {err:#}");
            PermissionSetDetails {
                permission_set_arn: Some(permission_set_arn.to_string()),
                ..PermissionSetDetails::default()
            }
        })
    }

    async fn resolve_policies(&self, permission_set_arn: &str) -> PolicyBundle {
        self.provider.permission_set_policies(permission_set_arn).await.unwrap_or_else(|err| {
            error!("Error getting policies for permission set {permission_set_arn}: {err:#}");
            PolicyBundle::default()
        })
    }
}
