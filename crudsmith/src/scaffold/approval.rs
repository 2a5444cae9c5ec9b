//! Approval state machine
//!
//! Generated pages encode a record's moderation state in two columns of the
//! main table: `<entity>_apv_id` (0 none, -1 flag-only, >0 id of a pending
//! shadow row) and `waiting_for` (0..=5). This module is the pure model of
//! that state: [`transition`] maps `(state, action)` to the next state and
//! the ordered [`SideEffect`]s the page performs. The controller emitter
//! compiles those effects into statements for every target, and
//! [`RecordStore`](crate::testing::RecordStore) applies them to in-memory
//! rows, so both follow the same table.
//!
//! | state \ action   | update     | activate / deactivate / delete | approve                  | reject                   |
//! |------------------|------------|--------------------------------|--------------------------|--------------------------|
//! | none             | queue (2)  | flag (3/4/5), guarded          | no-op                    | no-op                    |
//! | pending create   | blocked    | blocked                        | publish draft            | delete row               |
//! | pending update   | blocked    | blocked                        | copy shadow values       | discard shadow values    |
//! | pending 3/4/5    | blocked    | blocked                        | apply flag / delete row  | clear flag               |
//!
//! A pending record accepts no new change until it is approved or rejected,
//! which keeps at most one shadow row linked per record.

use super::field_type::FieldSet;
use super::options::GenerationOptions;

/// Approval link id meaning "pending without a shadow row"
pub const FLAG_ONLY_ID: i64 = -1;

/// Pending change kind, stored in `waiting_for`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WaitingFor {
    /// At rest
    Nothing,
    /// New record awaiting publication
    Create,
    /// New values awaiting publication
    Update,
    /// Activation awaiting approval
    Activate,
    /// Deactivation awaiting approval
    Deactivate,
    /// Deletion awaiting approval
    Delete,
}

impl WaitingFor {
    /// Pending kinds in code order
    pub const PENDING: [Self; 5] = [
        Self::Create,
        Self::Update,
        Self::Activate,
        Self::Deactivate,
        Self::Delete,
    ];

    /// Stored code
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Nothing => 0,
            Self::Create => 1,
            Self::Update => 2,
            Self::Activate => 3,
            Self::Deactivate => 4,
            Self::Delete => 5,
        }
    }

    /// Decode a stored code
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Nothing),
            1 => Some(Self::Create),
            2 => Some(Self::Update),
            3 => Some(Self::Activate),
            4 => Some(Self::Deactivate),
            5 => Some(Self::Delete),
            _ => None,
        }
    }

    /// Link a change of this kind is queued with
    #[must_use]
    pub const fn natural_link(self) -> ApvLink {
        match self {
            Self::Nothing => ApvLink::None,
            Self::Create | Self::Update => ApvLink::Shadow,
            Self::Activate | Self::Deactivate | Self::Delete => ApvLink::FlagOnly,
        }
    }
}

/// Meaning of the approval link column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApvLink {
    /// 0: nothing pending
    None,
    /// -1: pending without shadow row
    FlagOnly,
    /// >0: pending with a shadow row
    Shadow,
}

impl ApvLink {
    /// Classify a stored link id
    #[must_use]
    pub const fn from_id(id: i64) -> Self {
        match id {
            0 => Self::None,
            id if id < 0 => Self::FlagOnly,
            _ => Self::Shadow,
        }
    }
}

/// Moderation state of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordState {
    /// Approval link
    pub link: ApvLink,
    /// Pending change
    pub waiting_for: WaitingFor,
}

impl RecordState {
    /// At rest
    pub const NONE: Self = Self {
        link: ApvLink::None,
        waiting_for: WaitingFor::Nothing,
    };

    /// Pending with the link the kind is normally queued with
    #[must_use]
    pub const fn pending(waiting_for: WaitingFor) -> Self {
        Self {
            link: waiting_for.natural_link(),
            waiting_for,
        }
    }

    /// Decode the stored column pair; unknown codes read as at rest
    #[must_use]
    pub fn from_columns(apv_id: i64, waiting_for: i64) -> Self {
        Self {
            link: ApvLink::from_id(apv_id),
            waiting_for: WaitingFor::from_code(waiting_for).unwrap_or(WaitingFor::Nothing),
        }
    }

    /// Whether a change is pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.link != ApvLink::None
    }
}

/// Mutation requested through the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Insert a record
    Create,
    /// Change a record's values
    Update,
    /// Activate (`true`) or deactivate (`false`)
    SetActive(bool),
    /// Delete a record
    Delete,
    /// Accept the pending change
    Approve,
    /// Discard the pending change
    Reject,
}

/// Outcome stamped on a shadow row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// `status_approve = 1`
    Approved,
    /// `status_approve = -1`
    Rejected,
}

impl Verdict {
    /// Stored code
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Approved => 1,
            Self::Rejected => -1,
        }
    }
}

/// One step of a transition, performed in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideEffect {
    /// Insert a shadow row with the request values of `columns` and the key,
    /// stamped with the creator audit columns and `status_data = kind`
    InsertShadow {
        /// Business columns copied from the request
        columns: FieldSet,
        /// Change kind
        kind: WaitingFor,
    },
    /// Insert the main row
    InsertMain {
        /// Business columns copied from the request
        columns: FieldSet,
        /// Draft flag
        draft: bool,
        /// Initial pending state
        waiting_for: WaitingFor,
        /// Initial link; `Shadow` links the row inserted just before
        link: ApvLink,
    },
    /// Store the new main key in the shadow row inserted just before
    BindShadowKey,
    /// Overwrite business columns of the main row
    UpdateMain {
        /// Business columns copied from the request
        columns: FieldSet,
    },
    /// Queue a change on a row at rest; the WHERE clause always carries
    /// `<entity>_apv_id = 0` so a pending row is never re-queued
    MarkPending {
        /// Change kind
        waiting_for: WaitingFor,
        /// `Shadow` links the row inserted just before; `FlagOnly` stores -1
        link: ApvLink,
    },
    /// Copy business columns from the linked shadow row into the main row
    CopyFromShadow {
        /// Copied columns
        columns: FieldSet,
    },
    /// Set the `active` column
    SetActive(bool),
    /// Reset the link and pending state, optionally publishing the draft
    ClearPending {
        /// Also reset `draft`
        draft: bool,
    },
    /// Stamp the linked shadow row with a verdict and approver audit columns
    StampShadow(Verdict),
    /// Stamp the row the host moved into the trash table with the deleting
    /// user, right after [`SideEffect::DeleteMain`]
    ArchiveToTrash,
    /// Hard-delete the main row through the host library
    DeleteMain,
}

/// Feature flags the machine depends on
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ApprovalPolicy {
    /// Moderate mutations
    pub with_approval: bool,
    /// Archive before hard delete
    pub with_trash: bool,
    /// Store approval notes
    pub with_note: bool,
}

impl From<&GenerationOptions> for ApprovalPolicy {
    fn from(options: &GenerationOptions) -> Self {
        Self {
            with_approval: options.with_approval,
            with_trash: options.with_trash,
            with_note: options.with_note,
        }
    }
}

/// Next state and the effects leading to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Next state; `None` when the row no longer exists
    pub next: Option<RecordState>,
    /// Effects in execution order
    pub effects: Vec<SideEffect>,
}

impl Transition {
    fn stay(state: RecordState) -> Self {
        Self {
            next: Some(state),
            effects: Vec::new(),
        }
    }

    fn to(next: RecordState, effects: Vec<SideEffect>) -> Self {
        Self {
            next: Some(next),
            effects,
        }
    }

    fn removed(effects: Vec<SideEffect>) -> Self {
        Self {
            next: None,
            effects,
        }
    }

    /// Whether the transition changes nothing
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Compute the transition for `action` on a record in `state`
///
/// For [`Action::Create`] the state is ignored; the record does not exist yet.
#[must_use]
pub fn transition(policy: ApprovalPolicy, state: RecordState, action: Action) -> Transition {
    if policy.with_approval {
        moderated(policy, state, action)
    } else {
        direct(policy, state, action)
    }
}

fn direct(policy: ApprovalPolicy, state: RecordState, action: Action) -> Transition {
    match action {
        Action::Create => Transition::to(
            RecordState::NONE,
            vec![SideEffect::InsertMain {
                columns: FieldSet::Insert,
                draft: false,
                waiting_for: WaitingFor::Nothing,
                link: ApvLink::None,
            }],
        ),
        Action::Update => Transition::to(
            state,
            vec![SideEffect::UpdateMain {
                columns: FieldSet::Update,
            }],
        ),
        Action::SetActive(active) => Transition::to(state, vec![SideEffect::SetActive(active)]),
        Action::Delete => Transition::removed(hard_delete(policy)),
        Action::Approve | Action::Reject => Transition::stay(state),
    }
}

fn moderated(policy: ApprovalPolicy, state: RecordState, action: Action) -> Transition {
    match action {
        Action::Create => Transition::to(
            RecordState::pending(WaitingFor::Create),
            vec![
                SideEffect::InsertShadow {
                    columns: FieldSet::Insert,
                    kind: WaitingFor::Create,
                },
                SideEffect::InsertMain {
                    columns: FieldSet::Insert,
                    draft: true,
                    waiting_for: WaitingFor::Create,
                    link: ApvLink::Shadow,
                },
                SideEffect::BindShadowKey,
            ],
        ),
        Action::Update | Action::SetActive(_) | Action::Delete if state.is_pending() => {
            Transition::stay(state)
        }
        Action::Update => Transition::to(
            RecordState::pending(WaitingFor::Update),
            vec![
                SideEffect::InsertShadow {
                    columns: FieldSet::Update,
                    kind: WaitingFor::Update,
                },
                SideEffect::MarkPending {
                    waiting_for: WaitingFor::Update,
                    link: ApvLink::Shadow,
                },
            ],
        ),
        Action::SetActive(active) => {
            let waiting_for = if active {
                WaitingFor::Activate
            } else {
                WaitingFor::Deactivate
            };
            flag(waiting_for)
        }
        Action::Delete => flag(WaitingFor::Delete),
        Action::Approve => approve(policy, state),
        Action::Reject => reject(state),
    }
}

fn flag(waiting_for: WaitingFor) -> Transition {
    Transition::to(
        RecordState::pending(waiting_for),
        vec![SideEffect::MarkPending {
            waiting_for,
            link: ApvLink::FlagOnly,
        }],
    )
}

fn hard_delete(policy: ApprovalPolicy) -> Vec<SideEffect> {
    let mut effects = vec![SideEffect::DeleteMain];
    if policy.with_trash {
        effects.push(SideEffect::ArchiveToTrash);
    }
    effects
}

fn stamp(state: RecordState, verdict: Verdict) -> Option<SideEffect> {
    (state.link == ApvLink::Shadow).then_some(SideEffect::StampShadow(verdict))
}

fn approve(policy: ApprovalPolicy, state: RecordState) -> Transition {
    if !state.is_pending() {
        return Transition::stay(state);
    }
    let stamped = stamp(state, Verdict::Approved);
    match state.waiting_for {
        WaitingFor::Nothing => Transition::stay(state),
        WaitingFor::Create => Transition::to(
            RecordState::NONE,
            stamped
                .into_iter()
                .chain([SideEffect::ClearPending { draft: true }])
                .collect(),
        ),
        WaitingFor::Update => Transition::to(
            RecordState::NONE,
            [SideEffect::CopyFromShadow {
                columns: FieldSet::Update,
            }]
            .into_iter()
            .chain(stamped)
            .chain([SideEffect::ClearPending { draft: true }])
            .collect(),
        ),
        WaitingFor::Activate | WaitingFor::Deactivate => Transition::to(
            RecordState::NONE,
            [SideEffect::SetActive(
                state.waiting_for == WaitingFor::Activate,
            )]
            .into_iter()
            .chain(stamped)
            .chain([SideEffect::ClearPending { draft: false }])
            .collect(),
        ),
        WaitingFor::Delete => Transition::removed(
            stamped.into_iter().chain(hard_delete(policy)).collect(),
        ),
    }
}

fn reject(state: RecordState) -> Transition {
    if !state.is_pending() {
        return Transition::stay(state);
    }
    let stamped = stamp(state, Verdict::Rejected);
    match state.waiting_for {
        WaitingFor::Nothing => Transition::stay(state),
        WaitingFor::Create => Transition::removed(
            [SideEffect::DeleteMain].into_iter().chain(stamped).collect(),
        ),
        WaitingFor::Update
        | WaitingFor::Activate
        | WaitingFor::Deactivate
        | WaitingFor::Delete => Transition::to(
            RecordState::NONE,
            stamped
                .into_iter()
                .chain([SideEffect::ClearPending { draft: false }])
                .collect(),
        ),
    }
}

/// Transitions of `action` from every pending kind, for dispatching on the
/// stored `waiting_for` at run time
#[must_use]
pub fn pending_dispatch(policy: ApprovalPolicy, action: Action) -> Vec<(WaitingFor, Transition)> {
    WaitingFor::PENDING
        .iter()
        .map(|kind| (*kind, transition(policy, RecordState::pending(*kind), action)))
        .filter(|(_, transition)| !transition.is_noop())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::SideEffect::{
        ArchiveToTrash, BindShadowKey, ClearPending, CopyFromShadow, DeleteMain, InsertMain,
        InsertShadow, MarkPending, SetActive, StampShadow, UpdateMain,
    };

    const MODERATED: ApprovalPolicy = ApprovalPolicy {
        with_approval: true,
        with_trash: false,
        with_note: false,
    };

    const MODERATED_TRASH: ApprovalPolicy = ApprovalPolicy {
        with_approval: true,
        with_trash: true,
        with_note: false,
    };

    const DIRECT: ApprovalPolicy = ApprovalPolicy {
        with_approval: false,
        with_trash: false,
        with_note: false,
    };

    fn all_states() -> Vec<RecordState> {
        std::iter::once(RecordState::NONE)
            .chain(WaitingFor::PENDING.iter().map(|kind| RecordState::pending(*kind)))
            .collect()
    }

    #[test]
    fn test_codes_round_trip() {
        for kind in std::iter::once(WaitingFor::Nothing).chain(WaitingFor::PENDING) {
            assert_eq!(WaitingFor::from_code(kind.code()), Some(kind));
        }
        assert_eq!(WaitingFor::from_code(9), None);
        assert_eq!(ApvLink::from_id(FLAG_ONLY_ID), ApvLink::FlagOnly);
        assert_eq!(ApvLink::from_id(42), ApvLink::Shadow);
        assert_eq!(RecordState::from_columns(0, 7), RecordState::NONE);
    }

    #[test]
    fn test_create_queues_draft() {
        let transition = transition(MODERATED, RecordState::NONE, Action::Create);
        assert_eq!(
            transition.effects,
            vec![
                InsertShadow {
                    columns: FieldSet::Insert,
                    kind: WaitingFor::Create
                },
                InsertMain {
                    columns: FieldSet::Insert,
                    draft: true,
                    waiting_for: WaitingFor::Create,
                    link: ApvLink::Shadow
                },
                BindShadowKey,
            ]
        );
        assert_eq!(
            transition.next,
            Some(RecordState::pending(WaitingFor::Create))
        );
    }

    #[test]
    fn test_update_from_rest_queues_shadow_row() {
        let transition = transition(MODERATED, RecordState::NONE, Action::Update);
        assert_eq!(
            transition.effects,
            vec![
                InsertShadow {
                    columns: FieldSet::Update,
                    kind: WaitingFor::Update
                },
                MarkPending {
                    waiting_for: WaitingFor::Update,
                    link: ApvLink::Shadow
                },
            ]
        );
        assert_eq!(
            transition.next,
            Some(RecordState::pending(WaitingFor::Update))
        );
    }

    #[test]
    fn test_flag_transitions_from_rest() {
        for (action, kind) in [
            (Action::SetActive(true), WaitingFor::Activate),
            (Action::SetActive(false), WaitingFor::Deactivate),
            (Action::Delete, WaitingFor::Delete),
        ] {
            let transition = transition(MODERATED, RecordState::NONE, action);
            assert_eq!(
                transition.effects,
                vec![MarkPending {
                    waiting_for: kind,
                    link: ApvLink::FlagOnly
                }],
                "{action:?}"
            );
            assert_eq!(transition.next, Some(RecordState::pending(kind)));
        }
    }

    #[test]
    fn test_changes_blocked_while_pending() {
        for state in all_states().into_iter().filter(RecordState::is_pending) {
            for action in [
                Action::Update,
                Action::SetActive(true),
                Action::SetActive(false),
                Action::Delete,
            ] {
                let transition = transition(MODERATED, state, action);
                assert!(transition.is_noop(), "{state:?} {action:?}");
                assert_eq!(transition.next, Some(state));
            }
        }
    }

    #[test]
    fn test_approve_and_reject_at_rest_are_noops() {
        for action in [Action::Approve, Action::Reject] {
            let transition = transition(MODERATED, RecordState::NONE, action);
            assert!(transition.is_noop());
            assert_eq!(transition.next, Some(RecordState::NONE));
        }
    }

    #[test]
    fn test_approve_each_pending_state() {
        let approve = |kind| transition(MODERATED, RecordState::pending(kind), Action::Approve);

        assert_eq!(
            approve(WaitingFor::Create).effects,
            vec![StampShadow(Verdict::Approved), ClearPending { draft: true }]
        );
        assert_eq!(
            approve(WaitingFor::Update).effects,
            vec![
                CopyFromShadow {
                    columns: FieldSet::Update
                },
                StampShadow(Verdict::Approved),
                ClearPending { draft: true },
            ]
        );
        assert_eq!(
            approve(WaitingFor::Activate).effects,
            vec![SetActive(true), ClearPending { draft: false }]
        );
        assert_eq!(
            approve(WaitingFor::Deactivate).effects,
            vec![SetActive(false), ClearPending { draft: false }]
        );

        let delete = approve(WaitingFor::Delete);
        assert_eq!(delete.effects, vec![DeleteMain]);
        assert_eq!(delete.next, None);

        for kind in [WaitingFor::Create, WaitingFor::Update, WaitingFor::Activate] {
            assert_eq!(approve(kind).next, Some(RecordState::NONE));
        }
    }

    #[test]
    fn test_approved_delete_archives_with_trash() {
        let transition = transition(
            MODERATED_TRASH,
            RecordState::pending(WaitingFor::Delete),
            Action::Approve,
        );
        assert_eq!(transition.effects, vec![DeleteMain, ArchiveToTrash]);
    }

    #[test]
    fn test_reject_each_pending_state() {
        let reject = |kind| transition(MODERATED, RecordState::pending(kind), Action::Reject);

        let create = reject(WaitingFor::Create);
        assert_eq!(
            create.effects,
            vec![DeleteMain, StampShadow(Verdict::Rejected)]
        );
        assert_eq!(create.next, None);

        let update = reject(WaitingFor::Update);
        assert_eq!(
            update.effects,
            vec![StampShadow(Verdict::Rejected), ClearPending { draft: false }]
        );
        assert_eq!(update.next, Some(RecordState::NONE));

        for kind in [
            WaitingFor::Activate,
            WaitingFor::Deactivate,
            WaitingFor::Delete,
        ] {
            let transition = reject(kind);
            assert_eq!(transition.effects, vec![ClearPending { draft: false }]);
            assert_eq!(transition.next, Some(RecordState::NONE));
        }
    }

    #[test]
    fn test_rejection_code_is_negative() {
        assert_eq!(Verdict::Approved.code(), 1);
        assert_eq!(Verdict::Rejected.code(), -1);
    }

    #[test]
    fn test_direct_mutations() {
        assert_eq!(
            transition(DIRECT, RecordState::NONE, Action::Create).effects,
            vec![InsertMain {
                columns: FieldSet::Insert,
                draft: false,
                waiting_for: WaitingFor::Nothing,
                link: ApvLink::None
            }]
        );
        assert_eq!(
            transition(DIRECT, RecordState::NONE, Action::Update).effects,
            vec![UpdateMain {
                columns: FieldSet::Update
            }]
        );
        assert_eq!(
            transition(DIRECT, RecordState::NONE, Action::SetActive(false)).effects,
            vec![SetActive(false)]
        );
        assert_eq!(
            transition(DIRECT, RecordState::NONE, Action::Delete).effects,
            vec![DeleteMain]
        );

        let trash = ApprovalPolicy {
            with_trash: true,
            ..DIRECT
        };
        let delete = transition(trash, RecordState::NONE, Action::Delete);
        assert_eq!(delete.effects, vec![DeleteMain, ArchiveToTrash]);
        assert_eq!(delete.next, None);
    }

    #[test]
    fn test_direct_ignores_approval_actions() {
        for state in all_states() {
            for action in [Action::Approve, Action::Reject] {
                assert!(transition(DIRECT, state, action).is_noop());
            }
        }
    }

    #[test]
    fn test_pending_dispatch_covers_every_kind() {
        let approve = pending_dispatch(MODERATED, Action::Approve);
        assert_eq!(
            approve.iter().map(|(kind, _)| *kind).collect::<Vec<_>>(),
            WaitingFor::PENDING.to_vec()
        );
        assert!(pending_dispatch(DIRECT, Action::Approve).is_empty());
    }

    #[test]
    fn test_policy_from_options() {
        let policy = ApprovalPolicy::from(&GenerationOptions::default().with_approval().with_note());
        assert!(policy.with_approval);
        assert!(policy.with_note);
        assert!(!policy.with_trash);
    }
}
