//! Appointing and removing servants.
//!
//! One handler serves every (kind, level) pair in the servant table. Making a
//! servant of a single-holder role runs the full removal path for the current
//! holder once the new servant's identity account is in place. Closing a unit
//! runs the same path for every servant it still has.

use async_trait::async_trait;

use fl_core::history::HistoryEvent;
use fl_core::permissions::is_auth;
use fl_core::servants::{
    appointment_message, keeps_identity_account, removal_message, servant_config, ServantMessage,
};
use fl_core::{ChurchId, ChurchLevel, MemberId, RecordId, Role, ServantKind};
use fl_graph::{ChurchRef, GraphClient, GraphError, MemberRecord};

use crate::error::{ApiError, ApiResult};
use crate::external::{IdentityProvider, NewAccount, Notifier};

/// Graph operations the servant workflow needs.
#[async_trait]
pub trait ServantStore: Send + Sync {
    async fn member(&self, id: &MemberId) -> Result<MemberRecord, GraphError>;
    async fn church(&self, id: &ChurchId) -> Result<ChurchRef, GraphError>;
    async fn holders(&self, role: Role, church: &ChurchId) -> Result<Vec<MemberRecord>, GraphError>;
    async fn holds(&self, role: Role, member: &MemberId, church: &ChurchId) -> Result<bool, GraphError>;
    async fn role_count(&self, member: &MemberId) -> Result<i64, GraphError>;
    async fn link_account(&self, member: &MemberId, auth_id: Option<&str>) -> Result<(), GraphError>;
    async fn appoint(
        &self,
        role: Role,
        member: &MemberId,
        church: &ChurchId,
        event: &HistoryEvent,
        logged_by: &MemberId,
    ) -> Result<RecordId, GraphError>;
    async fn dismiss(
        &self,
        role: Role,
        member: &MemberId,
        church: &ChurchId,
        event: &HistoryEvent,
        logged_by: &MemberId,
    ) -> Result<RecordId, GraphError>;
}

#[async_trait]
impl ServantStore for GraphClient {
    async fn member(&self, id: &MemberId) -> Result<MemberRecord, GraphError> {
        self.get_member(id).await
    }

    async fn church(&self, id: &ChurchId) -> Result<ChurchRef, GraphError> {
        self.church_ref(id).await
    }

    async fn holders(&self, role: Role, church: &ChurchId) -> Result<Vec<MemberRecord>, GraphError> {
        self.current_servants(role, church).await
    }

    async fn holds(&self, role: Role, member: &MemberId, church: &ChurchId) -> Result<bool, GraphError> {
        self.holds_role(role, member, church).await
    }

    async fn role_count(&self, member: &MemberId) -> Result<i64, GraphError> {
        self.servant_role_count(member).await
    }

    async fn link_account(&self, member: &MemberId, auth_id: Option<&str>) -> Result<(), GraphError> {
        match auth_id {
            Some(id) => self.set_auth_id(member, id).await,
            None => self.clear_auth_id(member).await,
        }
    }

    async fn appoint(
        &self,
        role: Role,
        member: &MemberId,
        church: &ChurchId,
        event: &HistoryEvent,
        logged_by: &MemberId,
    ) -> Result<RecordId, GraphError> {
        self.appoint_servant(role, member, church, event, logged_by).await
    }

    async fn dismiss(
        &self,
        role: Role,
        member: &MemberId,
        church: &ChurchId,
        event: &HistoryEvent,
        logged_by: &MemberId,
    ) -> Result<RecordId, GraphError> {
        self.dismiss_servant(role, member, church, event, logged_by).await
    }
}

/// Which servant to change, at which unit.
#[derive(Debug, Clone, Copy)]
pub struct ServantRequest {
    pub kind: ServantKind,
    pub level: ChurchLevel,
    pub servant_id: MemberId,
    pub church_id: ChurchId,
}

#[derive(Debug, Clone)]
pub struct ServantOutcome {
    pub servant: MemberRecord,
    pub church: ChurchRef,
    pub role: Role,
    pub event: HistoryEvent,
}

pub struct ServantWorkflow<'a> {
    store: &'a dyn ServantStore,
    identity: &'a dyn IdentityProvider,
    notifier: &'a dyn Notifier,
}

impl<'a> ServantWorkflow<'a> {
    pub fn new(
        store: &'a dyn ServantStore,
        identity: &'a dyn IdentityProvider,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
        }
    }

    pub async fn make(
        &self,
        caller_roles: &[Role],
        acting: &MemberId,
        req: ServantRequest,
    ) -> ApiResult<ServantOutcome> {
        let cfg = servant_config(req.kind, req.level)?;
        if !is_auth(&cfg.permitted, caller_roles) {
            return Err(ApiError::Forbidden);
        }

        let servant = self.store.member(&req.servant_id).await?;
        let church = self.load_church(&req.church_id, req.level).await?;

        if self.store.holds(cfg.role, &servant.id, &church.id).await? {
            return Err(ApiError::Conflict(format!(
                "{} is already the {} of {} {}",
                servant.full_name(),
                cfg.role.kind.title(),
                church.name,
                church.level
            )));
        }

        // The current holder stays until the new servant's account is ready.
        let auth_id = self.ensure_account(&servant).await?;
        self.identity.assign_role(&auth_id, cfg.role).await?;

        if cfg.single_holder {
            for holder in self.store.holders(cfg.role, &church.id).await? {
                tracing::info!(
                    role = %cfg.role,
                    church = %church.id,
                    previous = %holder.id,
                    "Replacing current servant"
                );
                self.dismiss(holder, &church, cfg.role, acting).await?;
            }
        }

        let event = HistoryEvent::ServantAppointed {
            servant: servant.full_name(),
            role: cfg.role,
            church: church.name.clone(),
        };
        self.store
            .appoint(cfg.role, &servant.id, &church.id, &event, acting)
            .await?;

        let message = appointment_message(&servant.first_name, cfg.role, &church.name);
        self.notify(&servant, &message, true).await;

        tracing::info!(role = %cfg.role, servant = %servant.id, church = %church.id, "Servant made");
        Ok(ServantOutcome {
            servant,
            church,
            role: cfg.role,
            event,
        })
    }

    pub async fn remove(
        &self,
        caller_roles: &[Role],
        acting: &MemberId,
        req: ServantRequest,
    ) -> ApiResult<ServantOutcome> {
        let cfg = servant_config(req.kind, req.level)?;
        if !is_auth(&cfg.permitted, caller_roles) {
            return Err(ApiError::Forbidden);
        }

        let servant = self.store.member(&req.servant_id).await?;
        let church = self.load_church(&req.church_id, req.level).await?;

        if !self.store.holds(cfg.role, &servant.id, &church.id).await? {
            return Err(ApiError::BadInput(format!(
                "{} is not the {} of {} {}",
                servant.full_name(),
                cfg.role.kind.title(),
                church.name,
                church.level
            )));
        }

        let event = self.dismiss(servant.clone(), &church, cfg.role, acting).await?;
        Ok(ServantOutcome {
            servant,
            church,
            role: cfg.role,
            event,
        })
    }

    /// Dismiss every servant of a unit that is about to be closed down.
    ///
    /// Each holder goes through the same removal path as `remove`, so their
    /// identity roles are released and they are told by email.
    pub async fn release_unit(
        &self,
        acting: &MemberId,
        church_id: &ChurchId,
    ) -> ApiResult<Vec<HistoryEvent>> {
        let church = self.store.church(church_id).await?;
        let mut events = Vec::new();
        for kind in ServantKind::ALL {
            let Ok(cfg) = servant_config(kind, church.level) else {
                continue;
            };
            for holder in self.store.holders(cfg.role, &church.id).await? {
                events.push(self.dismiss(holder, &church, cfg.role, acting).await?);
            }
        }
        tracing::info!(church = %church.id, released = events.len(), "Unit servants released");
        Ok(events)
    }

    /// The removal path shared by `remove`, single-holder replacement and
    /// closing a unit.
    async fn dismiss(
        &self,
        servant: MemberRecord,
        church: &ChurchRef,
        role: Role,
        acting: &MemberId,
    ) -> ApiResult<HistoryEvent> {
        let roles_before = self.store.role_count(&servant.id).await?;

        let event = HistoryEvent::ServantRemoved {
            servant: servant.full_name(),
            role,
            church: church.name.clone(),
        };
        self.store
            .dismiss(role, &servant.id, &church.id, &event, acting)
            .await?;

        if let Some(auth_id) = &servant.auth_id {
            self.release_account(&servant.id, auth_id, role, roles_before)
                .await;
        }

        let message = removal_message(&servant.first_name, role, &church.name);
        self.notify(&servant, &message, false).await;

        tracing::info!(role = %role, servant = %servant.id, church = %church.id, "Servant removed");
        Ok(event)
    }

    async fn load_church(&self, id: &ChurchId, level: ChurchLevel) -> ApiResult<ChurchRef> {
        let church = self.store.church(id).await?;
        if church.level != level {
            return Err(ApiError::BadInput(format!(
                "{} is a {}, not a {level}",
                church.name, church.level
            )));
        }
        Ok(church)
    }

    /// Find or create the servant's identity account and link it to the member.
    async fn ensure_account(&self, servant: &MemberRecord) -> ApiResult<String> {
        if let Some(auth_id) = &servant.auth_id {
            return Ok(auth_id.clone());
        }

        let auth_id = match self.identity.find_account(&servant.email).await? {
            Some(existing) => existing,
            None => {
                let created = self
                    .identity
                    .create_account(&NewAccount {
                        member_id: servant.id,
                        first_name: servant.first_name.clone(),
                        last_name: servant.last_name.clone(),
                        email: servant.email.clone(),
                    })
                    .await?;
                if let Err(e) = self.identity.send_password_reset(&servant.email).await {
                    tracing::error!(error = %e, email = %servant.email, "Password reset email failed");
                }
                created
            }
        };

        self.store.link_account(&servant.id, Some(&auth_id)).await?;
        Ok(auth_id)
    }

    /// Drop the role from the identity account, and the account itself when
    /// this was the servant's last role. The graph change has already been
    /// committed, so failures are logged rather than returned.
    async fn release_account(&self, member: &MemberId, auth_id: &str, role: Role, roles_before: i64) {
        if let Err(e) = self.identity.remove_role(auth_id, role).await {
            tracing::error!(error = %e, auth_id, role = %role, "Failed to remove identity role");
        }
        if keeps_identity_account(roles_before) {
            return;
        }
        match self.identity.delete_account(auth_id).await {
            Ok(()) => {
                if let Err(e) = self.store.link_account(member, None).await {
                    tracing::error!(error = %e, member = %member, "Failed to unlink identity account");
                }
            }
            Err(e) => tracing::error!(error = %e, auth_id, "Failed to delete identity account"),
        }
    }

    async fn notify(&self, servant: &MemberRecord, message: &ServantMessage, sms: bool) {
        if let Err(e) = self.notifier.send_email(&servant.email, message).await {
            tracing::error!(error = %e, to = %servant.email, "Servant email failed");
        }
        if sms && !servant.phone_number.is_empty() {
            if let Err(e) = self.notifier.send_sms(&servant.phone_number, &message.body).await {
                tracing::error!(error = %e, to = %servant.phone_number, "Servant SMS failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use crate::external::LogIdentityProvider;

    #[derive(Default)]
    struct MemoryStore {
        members: Mutex<HashMap<MemberId, MemberRecord>>,
        churches: HashMap<ChurchId, ChurchRef>,
        servants: Mutex<HashSet<(MemberId, Role, ChurchId)>>,
        history: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn add_member(&self, first_name: &str, auth_id: Option<&str>) -> MemberId {
            let id = MemberId::new();
            self.members.lock().unwrap().insert(
                id,
                MemberRecord {
                    id,
                    first_name: first_name.into(),
                    middle_name: None,
                    last_name: "Boateng".into(),
                    email: format!("{}@example.com", first_name.to_lowercase()),
                    phone_number: "+233241234567".into(),
                    whatsapp_number: String::new(),
                    gender: None,
                    marital_status: None,
                    date_of_birth: None,
                    occupation: None,
                    picture_url: None,
                    auth_id: auth_id.map(String::from),
                    fellowship: None,
                },
            );
            id
        }

        fn auth_id(&self, id: &MemberId) -> Option<String> {
            self.members.lock().unwrap()[id].auth_id.clone()
        }
    }

    fn not_found(label: &str, id: impl ToString) -> GraphError {
        GraphError::not_found(label, id)
    }

    #[async_trait]
    impl ServantStore for MemoryStore {
        async fn member(&self, id: &MemberId) -> Result<MemberRecord, GraphError> {
            self.members
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| not_found("Member", id))
        }

        async fn church(&self, id: &ChurchId) -> Result<ChurchRef, GraphError> {
            self.churches.get(id).cloned().ok_or_else(|| not_found("Church", id))
        }

        async fn holders(&self, role: Role, church: &ChurchId) -> Result<Vec<MemberRecord>, GraphError> {
            let ids: Vec<MemberId> = self
                .servants
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, r, c)| *r == role && c == church)
                .map(|(m, _, _)| *m)
                .collect();
            let members = self.members.lock().unwrap();
            Ok(ids.iter().filter_map(|id| members.get(id).cloned()).collect())
        }

        async fn holds(&self, role: Role, member: &MemberId, church: &ChurchId) -> Result<bool, GraphError> {
            Ok(self.servants.lock().unwrap().contains(&(*member, role, *church)))
        }

        async fn role_count(&self, member: &MemberId) -> Result<i64, GraphError> {
            Ok(self
                .servants
                .lock()
                .unwrap()
                .iter()
                .filter(|(m, _, _)| m == member)
                .count() as i64)
        }

        async fn link_account(&self, member: &MemberId, auth_id: Option<&str>) -> Result<(), GraphError> {
            let mut members = self.members.lock().unwrap();
            let m = members.get_mut(member).ok_or_else(|| not_found("Member", member))?;
            m.auth_id = auth_id.map(String::from);
            Ok(())
        }

        async fn appoint(
            &self,
            role: Role,
            member: &MemberId,
            church: &ChurchId,
            event: &HistoryEvent,
            _logged_by: &MemberId,
        ) -> Result<RecordId, GraphError> {
            self.servants.lock().unwrap().insert((*member, role, *church));
            self.history.lock().unwrap().push(event.record());
            Ok(RecordId::new())
        }

        async fn dismiss(
            &self,
            role: Role,
            member: &MemberId,
            church: &ChurchId,
            event: &HistoryEvent,
            _logged_by: &MemberId,
        ) -> Result<RecordId, GraphError> {
            self.servants.lock().unwrap().remove(&(*member, role, *church));
            self.history.lock().unwrap().push(event.record());
            Ok(RecordId::new())
        }
    }

    /// Records identity calls so tests can assert on them.
    #[derive(Default)]
    struct RecordingIdentity {
        calls: Mutex<Vec<String>>,
        refuse_new_accounts: bool,
    }

    #[async_trait]
    impl IdentityProvider for RecordingIdentity {
        async fn find_account(&self, _email: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        async fn create_account(&self, account: &NewAccount) -> anyhow::Result<String> {
            if self.refuse_new_accounts {
                anyhow::bail!("identity provider unavailable");
            }
            self.calls.lock().unwrap().push(format!("create {}", account.email));
            Ok(format!("auth|{}", account.first_name.to_lowercase()))
        }

        async fn send_password_reset(&self, email: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("reset {email}"));
            Ok(())
        }

        async fn assign_role(&self, auth_id: &str, role: Role) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("assign {auth_id} {role}"));
            Ok(())
        }

        async fn remove_role(&self, auth_id: &str, role: Role) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("remove {auth_id} {role}"));
            Ok(())
        }

        async fn delete_account(&self, auth_id: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("delete {auth_id}"));
            Ok(())
        }
    }

    /// Every send fails; the workflow must carry on regardless.
    struct BrokenNotifier;

    #[async_trait]
    impl Notifier for BrokenNotifier {
        async fn send_email(&self, _to: &str, _message: &ServantMessage) -> anyhow::Result<()> {
            anyhow::bail!("mail server down")
        }

        async fn send_sms(&self, _to: &str, _body: &str) -> anyhow::Result<()> {
            anyhow::bail!("sms gateway down")
        }
    }

    struct Fixture {
        store: MemoryStore,
        bacenta: ChurchId,
        council: ChurchId,
        admin: MemberId,
    }

    fn fixture() -> Fixture {
        let bacenta = ChurchId::new();
        let council = ChurchId::new();
        let mut store = MemoryStore::default();
        store.churches.insert(
            bacenta,
            ChurchRef {
                id: bacenta,
                name: "Adenta".into(),
                level: ChurchLevel::Bacenta,
            },
        );
        store.churches.insert(
            council,
            ChurchRef {
                id: council,
                name: "Spintex".into(),
                level: ChurchLevel::Council,
            },
        );
        let admin = store.add_member("Akua", Some("auth|akua"));
        Fixture {
            store,
            bacenta,
            council,
            admin,
        }
    }

    fn governorship_admin() -> Vec<Role> {
        vec![Role::new(ServantKind::Admin, ChurchLevel::Governorship).unwrap()]
    }

    fn leader_request(servant: MemberId, church: ChurchId) -> ServantRequest {
        ServantRequest {
            kind: ServantKind::Leader,
            level: ChurchLevel::Bacenta,
            servant_id: servant,
            church_id: church,
        }
    }

    #[tokio::test]
    async fn test_make_leader_creates_account_and_logs() {
        let f = fixture();
        let kofi = f.store.add_member("Kofi", None);
        let identity = RecordingIdentity::default();
        let wf = ServantWorkflow::new(&f.store, &identity, &BrokenNotifier);

        let outcome = wf
            .make(&governorship_admin(), &f.admin, leader_request(kofi, f.bacenta))
            .await
            .unwrap();

        assert_eq!(outcome.role.to_string(), "leaderBacenta");
        assert_eq!(f.store.auth_id(&kofi).as_deref(), Some("auth|kofi"));
        let calls = identity.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "create kofi@example.com".to_string(),
                "reset kofi@example.com".to_string(),
                "assign auth|kofi leaderBacenta".to_string(),
            ]
        );
        let history = f.store.history.lock().unwrap().clone();
        assert_eq!(history, vec!["Kofi Boateng became the Leader of Adenta Bacenta"]);
    }

    #[tokio::test]
    async fn test_make_requires_permission() {
        let f = fixture();
        let kofi = f.store.add_member("Kofi", None);
        let identity = RecordingIdentity::default();
        let wf = ServantWorkflow::new(&f.store, &identity, &BrokenNotifier);

        let bacenta_leader = vec![Role::new(ServantKind::Leader, ChurchLevel::Bacenta).unwrap()];
        let err = wf
            .make(&bacenta_leader, &f.admin, leader_request(kofi, f.bacenta))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
        assert!(identity.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_holder_is_replaced() {
        let f = fixture();
        let kofi = f.store.add_member("Kofi", None);
        let ama = f.store.add_member("Ama", None);
        let identity = RecordingIdentity::default();
        let wf = ServantWorkflow::new(&f.store, &identity, &BrokenNotifier);
        let roles = governorship_admin();

        wf.make(&roles, &f.admin, leader_request(kofi, f.bacenta)).await.unwrap();
        wf.make(&roles, &f.admin, leader_request(ama, f.bacenta)).await.unwrap();

        let role = Role::new(ServantKind::Leader, ChurchLevel::Bacenta).unwrap();
        let holders = f.store.holders(role, &f.bacenta).await.unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].id, ama);

        // Kofi had no other role, so his account went with the leadership.
        let calls = identity.calls.lock().unwrap().clone();
        assert!(calls.contains(&"delete auth|kofi".to_string()));
        assert_eq!(f.store.auth_id(&kofi), None);
    }

    #[tokio::test]
    async fn test_account_kept_while_other_roles_remain() {
        let f = fixture();
        let kofi = f.store.add_member("Kofi", Some("auth|kofi"));
        let council_leader = Role::new(ServantKind::Leader, ChurchLevel::Council).unwrap();
        f.store
            .servants
            .lock()
            .unwrap()
            .insert((kofi, council_leader, f.council));

        let identity = RecordingIdentity::default();
        let wf = ServantWorkflow::new(&f.store, &identity, &BrokenNotifier);
        let roles = governorship_admin();

        wf.make(&roles, &f.admin, leader_request(kofi, f.bacenta)).await.unwrap();
        wf.remove(&roles, &f.admin, leader_request(kofi, f.bacenta)).await.unwrap();

        let calls = identity.calls.lock().unwrap().clone();
        assert!(calls.contains(&"remove auth|kofi leaderBacenta".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("delete")));
        assert_eq!(f.store.auth_id(&kofi).as_deref(), Some("auth|kofi"));
    }

    #[tokio::test]
    async fn test_remove_non_holder_is_rejected() {
        let f = fixture();
        let kofi = f.store.add_member("Kofi", None);
        let wf = ServantWorkflow::new(&f.store, &LogIdentityProvider, &BrokenNotifier);

        let err = wf
            .remove(&governorship_admin(), &f.admin, leader_request(kofi, f.bacenta))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadInput(_)));
    }

    #[tokio::test]
    async fn test_level_mismatch_is_rejected() {
        let f = fixture();
        let kofi = f.store.add_member("Kofi", None);
        let wf = ServantWorkflow::new(&f.store, &LogIdentityProvider, &BrokenNotifier);

        let err = wf
            .make(&governorship_admin(), &f.admin, leader_request(kofi, f.council))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadInput(_)));
    }

    #[tokio::test]
    async fn test_failed_account_setup_keeps_current_holder() {
        let f = fixture();
        let kofi = f.store.add_member("Kofi", None);
        let ama = f.store.add_member("Ama", None);
        let roles = governorship_admin();

        let identity = RecordingIdentity::default();
        let wf = ServantWorkflow::new(&f.store, &identity, &BrokenNotifier);
        wf.make(&roles, &f.admin, leader_request(kofi, f.bacenta)).await.unwrap();
        let history_before = f.store.history.lock().unwrap().len();

        let refusing = RecordingIdentity {
            refuse_new_accounts: true,
            ..Default::default()
        };
        let wf = ServantWorkflow::new(&f.store, &refusing, &BrokenNotifier);
        let err = wf
            .make(&roles, &f.admin, leader_request(ama, f.bacenta))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));

        let role = Role::new(ServantKind::Leader, ChurchLevel::Bacenta).unwrap();
        let holders = f.store.holders(role, &f.bacenta).await.unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].id, kofi);
        assert_eq!(f.store.history.lock().unwrap().len(), history_before);
        assert!(refusing.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_unit_dismisses_every_servant() {
        let f = fixture();
        let kofi = f.store.add_member("Kofi", Some("auth|kofi"));
        let ama = f.store.add_member("Ama", Some("auth|ama"));
        let yaw = f.store.add_member("Yaw", Some("auth|yaw"));
        let council_leader = Role::new(ServantKind::Leader, ChurchLevel::Council).unwrap();
        let council_admin = Role::new(ServantKind::Admin, ChurchLevel::Council).unwrap();
        let bacenta_leader = Role::new(ServantKind::Leader, ChurchLevel::Bacenta).unwrap();
        {
            let mut servants = f.store.servants.lock().unwrap();
            servants.insert((kofi, council_leader, f.council));
            servants.insert((ama, council_admin, f.council));
            servants.insert((yaw, council_admin, f.council));
            servants.insert((yaw, bacenta_leader, f.bacenta));
        }

        let identity = RecordingIdentity::default();
        let wf = ServantWorkflow::new(&f.store, &identity, &BrokenNotifier);
        let events = wf.release_unit(&f.admin, &f.council).await.unwrap();

        assert_eq!(events.len(), 3);
        let left: Vec<_> = f.store.servants.lock().unwrap().iter().cloned().collect();
        assert_eq!(left, vec![(yaw, bacenta_leader, f.bacenta)]);

        let calls = identity.calls.lock().unwrap().clone();
        assert!(calls.contains(&"remove auth|kofi leaderCouncil".to_string()));
        assert!(calls.contains(&"delete auth|ama".to_string()));
        // Yaw still leads a bacenta, so the account stays.
        assert!(calls.contains(&"remove auth|yaw adminCouncil".to_string()));
        assert!(!calls.contains(&"delete auth|yaw".to_string()));
        assert_eq!(f.store.auth_id(&yaw).as_deref(), Some("auth|yaw"));
        assert_eq!(f.store.history.lock().unwrap().len(), 3);
    }
}
