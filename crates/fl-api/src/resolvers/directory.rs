//! Members and church units.

use async_graphql::{Context, InputObject, Object, Result, ResultExt, ID};
use chrono::{NaiveDate, Utc};

use fl_core::churches::validate_church_name;
use fl_core::history::HistoryEvent;
use fl_core::members::MemberDetails;
use fl_core::permissions::{permit_admin, permit_leader_admin};
use fl_core::{ChurchId, ChurchLevel, MemberId};
use fl_graph::history::HistoryLinks;
use fl_graph::MemberRecord;

use crate::auth::{current_user, require_roles};
use crate::context::{parse_id, ApiContext};
use crate::error::ApiResult;
use crate::types::{
    Church, ChurchDetails, ChurchLevelGql, GenderGql, HistoryEntry, MaritalStatusGql, Member,
};
use crate::workflow::servants::ServantWorkflow;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const DEFAULT_HISTORY_LIMIT: u32 = 50;

#[derive(InputObject, Clone, Debug)]
pub struct MemberInput {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub whatsapp_number: String,
    pub gender: GenderGql,
    pub marital_status: MaritalStatusGql,
    pub date_of_birth: NaiveDate,
    pub occupation: Option<String>,
    pub picture_url: String,
}

impl From<MemberInput> for MemberDetails {
    fn from(i: MemberInput) -> Self {
        Self {
            first_name: i.first_name,
            middle_name: i.middle_name,
            last_name: i.last_name,
            email: i.email,
            phone_number: i.phone_number,
            whatsapp_number: i.whatsapp_number,
            gender: i.gender.into(),
            marital_status: i.marital_status.into(),
            date_of_birth: i.date_of_birth,
            occupation: i.occupation,
            picture_url: i.picture_url,
        }
    }
}

/// Names of the fields that differ between the stored member and the update.
fn changed_fields(old: &MemberRecord, new: &MemberDetails) -> Vec<String> {
    let pairs: [(&str, Option<&str>, Option<&str>); 10] = [
        ("first name", Some(old.first_name.as_str()), Some(new.first_name.as_str())),
        ("middle name", old.middle_name.as_deref(), new.middle_name.as_deref()),
        ("last name", Some(old.last_name.as_str()), Some(new.last_name.as_str())),
        ("email", Some(old.email.as_str()), Some(new.email.as_str())),
        ("phone number", Some(old.phone_number.as_str()), Some(new.phone_number.as_str())),
        ("whatsapp number", Some(old.whatsapp_number.as_str()), Some(new.whatsapp_number.as_str())),
        ("gender", old.gender.as_deref(), Some(new.gender.as_str())),
        ("marital status", old.marital_status.as_deref(), Some(new.marital_status.as_str())),
        ("occupation", old.occupation.as_deref(), new.occupation.as_deref()),
        ("picture", old.picture_url.as_deref(), Some(new.picture_url.as_str())),
    ];
    let mut fields: Vec<String> = pairs
        .into_iter()
        .filter(|(_, a, b)| a != b)
        .map(|(name, _, _)| name.to_string())
        .collect();
    if old.date_of_birth.as_deref() != Some(new.date_of_birth.to_string().as_str()) {
        fields.push("date of birth".into());
    }
    fields
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Default)]
pub struct DirectoryQuery;

#[Object]
impl DirectoryQuery {
    /// The member record of the logged-in user.
    async fn me(&self, ctx: &Context<'_>) -> Result<Member> {
        me(ctx).await.extend()
    }

    async fn member(&self, ctx: &Context<'_>, id: ID) -> Result<Member> {
        member(ctx, id).await.extend()
    }

    /// Role claims a member currently holds, e.g. `leaderBacenta`.
    async fn member_roles(&self, ctx: &Context<'_>, id: ID) -> Result<Vec<String>> {
        member_roles(ctx, id).await.extend()
    }

    /// Members whose name or email contains `term`.
    async fn search_members(
        &self,
        ctx: &Context<'_>,
        term: String,
        limit: Option<u32>,
    ) -> Result<Vec<Member>> {
        search_members(ctx, term, limit).await.extend()
    }

    async fn church(&self, ctx: &Context<'_>, id: ID) -> Result<ChurchDetails> {
        church(ctx, id).await.extend()
    }

    async fn church_children(&self, ctx: &Context<'_>, id: ID) -> Result<Vec<Church>> {
        church_children(ctx, id).await.extend()
    }

    /// History logs of a member or church unit, newest first.
    async fn history(
        &self,
        ctx: &Context<'_>,
        id: ID,
        limit: Option<u32>,
    ) -> Result<Vec<HistoryEntry>> {
        history(ctx, id, limit).await.extend()
    }
}

async fn me(ctx: &Context<'_>) -> ApiResult<Member> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    Ok(api.acting_member(ctx).await?.into())
}

async fn member(ctx: &Context<'_>, id: ID) -> ApiResult<Member> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    let id: MemberId = parse_id(&id)?;
    Ok(api.graph.get_member(&id).await?.into())
}

async fn member_roles(ctx: &Context<'_>, id: ID) -> ApiResult<Vec<String>> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    let id: MemberId = parse_id(&id)?;
    let roles = api.graph.servant_roles(&id).await?;
    Ok(roles.iter().map(ToString::to_string).collect())
}

async fn search_members(ctx: &Context<'_>, term: String, limit: Option<u32>) -> ApiResult<Vec<Member>> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    let members = api
        .graph
        .search_members(term.trim(), limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .await?;
    Ok(members.into_iter().map(Member::from).collect())
}

async fn church(ctx: &Context<'_>, id: ID) -> ApiResult<ChurchDetails> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    let id: ChurchId = parse_id(&id)?;
    let unit = api.graph.church_ref(&id).await?;
    Ok(api.graph.get_church(unit.level, &id).await?.into())
}

async fn church_children(ctx: &Context<'_>, id: ID) -> ApiResult<Vec<Church>> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    let id: ChurchId = parse_id(&id)?;
    let unit = api.graph.church_ref(&id).await?;
    let children = api.graph.list_children(unit.level, &id).await?;
    Ok(children.into_iter().map(Church::from).collect())
}

async fn history(ctx: &Context<'_>, id: ID, limit: Option<u32>) -> ApiResult<Vec<HistoryEntry>> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    let logs = api
        .graph
        .list_history(id.as_str(), limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(logs.into_iter().map(HistoryEntry::from).collect())
}

#[derive(Default)]
pub struct DirectoryMutation;

#[Object]
impl DirectoryMutation {
    async fn create_member(
        &self,
        ctx: &Context<'_>,
        fellowship_id: ID,
        input: MemberInput,
    ) -> Result<Member> {
        create_member(ctx, fellowship_id, input).await.extend()
    }

    async fn update_member_details(
        &self,
        ctx: &Context<'_>,
        member_id: ID,
        input: MemberInput,
    ) -> Result<Member> {
        update_member_details(ctx, member_id, input).await.extend()
    }

    async fn move_member(
        &self,
        ctx: &Context<'_>,
        member_id: ID,
        fellowship_id: ID,
    ) -> Result<Member> {
        move_member(ctx, member_id, fellowship_id).await.extend()
    }

    /// Start a new unit under `parent_id`, which must be one level up.
    async fn create_church(
        &self,
        ctx: &Context<'_>,
        level: ChurchLevelGql,
        name: String,
        parent_id: ID,
    ) -> Result<Church> {
        create_church(ctx, level.into(), name, parent_id).await.extend()
    }

    async fn close_down_church(
        &self,
        ctx: &Context<'_>,
        level: ChurchLevelGql,
        church_id: ID,
    ) -> Result<Church> {
        close_down_church(ctx, level.into(), church_id).await.extend()
    }

    async fn move_church(
        &self,
        ctx: &Context<'_>,
        level: ChurchLevelGql,
        church_id: ID,
        new_parent_id: ID,
    ) -> Result<Church> {
        move_church(ctx, level.into(), church_id, new_parent_id)
            .await
            .extend()
    }
}

/// Admins one level up from `level` and above may restructure units at `level`.
fn structure_permission(level: ChurchLevel) -> Vec<fl_core::Role> {
    permit_admin(level.parent().unwrap_or(level))
}

async fn create_member(ctx: &Context<'_>, fellowship_id: ID, input: MemberInput) -> ApiResult<Member> {
    require_roles(ctx, &permit_leader_admin(ChurchLevel::Fellowship))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let fellowship_id: ChurchId = parse_id(&fellowship_id)?;

    let details = MemberDetails::from(input).normalize(today())?;
    let created = api.graph.create_member(&details, &fellowship_id).await?;

    let fellowship = created
        .fellowship
        .as_ref()
        .map(|f| f.name.clone())
        .unwrap_or_default();
    api.graph
        .record_history(
            &HistoryEvent::MemberRegistered {
                member: created.full_name(),
                fellowship,
            },
            &HistoryLinks {
                member: Some(created.id),
                church: Some(fellowship_id),
                logged_by: Some(acting.id),
            },
        )
        .await?;

    Ok(created.into())
}

async fn update_member_details(ctx: &Context<'_>, member_id: ID, input: MemberInput) -> ApiResult<Member> {
    require_roles(ctx, &permit_leader_admin(ChurchLevel::Fellowship))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let member_id: MemberId = parse_id(&member_id)?;

    let details = MemberDetails::from(input).normalize(today())?;
    let before = api.graph.get_member(&member_id).await?;
    let fields = changed_fields(&before, &details);
    let updated = api.graph.update_member(&member_id, &details).await?;

    if !fields.is_empty() {
        api.graph
            .record_history(
                &HistoryEvent::MemberDetailsUpdated {
                    member: updated.full_name(),
                    fields,
                },
                &HistoryLinks {
                    member: Some(member_id),
                    church: None,
                    logged_by: Some(acting.id),
                },
            )
            .await?;
    }
    Ok(updated.into())
}

async fn move_member(ctx: &Context<'_>, member_id: ID, fellowship_id: ID) -> ApiResult<Member> {
    require_roles(ctx, &permit_leader_admin(ChurchLevel::Fellowship))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let member_id: MemberId = parse_id(&member_id)?;
    let fellowship_id: ChurchId = parse_id(&fellowship_id)?;

    let (from, to) = api.graph.move_member(&member_id, &fellowship_id).await?;
    let moved = api.graph.get_member(&member_id).await?;
    api.graph
        .record_history(
            &HistoryEvent::MemberMoved {
                member: moved.full_name(),
                from,
                to,
            },
            &HistoryLinks {
                member: Some(member_id),
                church: Some(fellowship_id),
                logged_by: Some(acting.id),
            },
        )
        .await?;
    Ok(moved.into())
}

async fn create_church(
    ctx: &Context<'_>,
    level: ChurchLevel,
    name: String,
    parent_id: ID,
) -> ApiResult<Church> {
    require_roles(ctx, &structure_permission(level))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let parent_id: ChurchId = parse_id(&parent_id)?;
    let name = validate_church_name(&name)?;

    let (unit, parent) = api.graph.create_church(level, &name, &parent_id).await?;
    api.graph
        .record_history(
            &HistoryEvent::UnitStarted {
                unit: unit.name.clone(),
                level,
                parent,
            },
            &HistoryLinks {
                member: None,
                church: Some(unit.id),
                logged_by: Some(acting.id),
            },
        )
        .await?;
    Ok(unit.into())
}

async fn close_down_church(ctx: &Context<'_>, level: ChurchLevel, church_id: ID) -> ApiResult<Church> {
    require_roles(ctx, &structure_permission(level))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let church_id: ChurchId = parse_id(&church_id)?;

    let unit = api.graph.church_ref(&church_id).await?;
    api.graph.ensure_church_can_close(level, &church_id).await?;

    // Servants lose their roles before the unit is relabelled.
    let workflow = ServantWorkflow::new(&api.graph, api.identity.as_ref(), api.notifier.as_ref());
    workflow.release_unit(&acting.id, &church_id).await?;

    api.graph.close_down_church(level, &church_id).await?;
    api.graph
        .record_history(
            &HistoryEvent::UnitClosed {
                unit: unit.name.clone(),
                level,
            },
            &HistoryLinks {
                member: None,
                church: Some(church_id),
                logged_by: Some(acting.id),
            },
        )
        .await?;
    Ok(unit.into())
}

async fn move_church(
    ctx: &Context<'_>,
    level: ChurchLevel,
    church_id: ID,
    new_parent_id: ID,
) -> ApiResult<Church> {
    require_roles(ctx, &structure_permission(level))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let church_id: ChurchId = parse_id(&church_id)?;
    let new_parent_id: ChurchId = parse_id(&new_parent_id)?;

    let (from, to) = api.graph.move_church(level, &church_id, &new_parent_id).await?;
    let unit = api.graph.church_ref(&church_id).await?;
    api.graph
        .record_history(
            &HistoryEvent::UnitMoved {
                unit: unit.name.clone(),
                level,
                from,
                to,
            },
            &HistoryLinks {
                member: None,
                church: Some(church_id),
                logged_by: Some(acting.id),
            },
        )
        .await?;
    Ok(unit.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::members::{Gender, MaritalStatus};

    fn stored() -> MemberRecord {
        MemberRecord {
            id: MemberId::new(),
            first_name: "Ama".into(),
            middle_name: None,
            last_name: "Mensah".into(),
            email: "ama@example.com".into(),
            phone_number: "+233241234567".into(),
            whatsapp_number: "+233241234567".into(),
            gender: Some("Female".into()),
            marital_status: Some("Single".into()),
            date_of_birth: Some("1995-04-12".into()),
            occupation: None,
            picture_url: Some("https://img.example.com/ama.jpg".into()),
            auth_id: None,
            fellowship: None,
        }
    }

    fn details() -> MemberDetails {
        MemberDetails {
            first_name: "Ama".into(),
            middle_name: None,
            last_name: "Mensah".into(),
            email: "ama@example.com".into(),
            phone_number: "+233241234567".into(),
            whatsapp_number: "+233241234567".into(),
            gender: Gender::Female,
            marital_status: MaritalStatus::Single,
            date_of_birth: NaiveDate::from_ymd_opt(1995, 4, 12).unwrap(),
            occupation: None,
            picture_url: "https://img.example.com/ama.jpg".into(),
        }
    }

    #[test]
    fn test_no_changes_detected() {
        assert!(changed_fields(&stored(), &details()).is_empty());
    }

    #[test]
    fn test_changed_fields_listed() {
        let mut new = details();
        new.marital_status = MaritalStatus::Married;
        new.phone_number = "+233201112222".into();
        new.date_of_birth = NaiveDate::from_ymd_opt(1995, 4, 13).unwrap();
        assert_eq!(
            changed_fields(&stored(), &new),
            vec!["phone number", "marital status", "date of birth"]
        );
    }

    #[test]
    fn test_structure_permission_is_one_level_up() {
        let roles = structure_permission(ChurchLevel::Bacenta);
        assert!(roles.iter().all(|r| r.level >= ChurchLevel::Governorship));
        assert!(!roles.is_empty());
    }
}
