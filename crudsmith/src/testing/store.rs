//! In-memory record store
//!
//! Applies [`SideEffect`]s to plain rows the same way the generated
//! controller applies them to the database, so workflow scenarios can be
//! checked without a database or a target-language runtime.

use crate::scaffold::approval::{
    transition, Action, ApprovalPolicy, ApvLink, RecordState, SideEffect, Transition, FLAG_ONLY_ID,
};
use crate::scaffold::context::GenerationContext;
use crate::scaffold::field_type::FieldSet;
use std::collections::BTreeMap;

/// Row of the main table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainRow {
    /// Primary key
    pub id: i64,
    /// Business column values
    pub values: BTreeMap<String, String>,
    /// `<entity>_apv_id`
    pub apv_id: i64,
    /// `waiting_for`
    pub waiting_for: i64,
    /// `draft`
    pub draft: bool,
    /// `active`
    pub active: bool,
}

impl MainRow {
    /// Value of a business column
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Decoded moderation state
    #[must_use]
    pub fn state(&self) -> RecordState {
        RecordState::from_columns(self.apv_id, self.waiting_for)
    }
}

/// Row of the shadow table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowRow {
    /// `<entity>_apv_id`
    pub apv_id: i64,
    /// Key of the main row the change belongs to
    pub key: Option<i64>,
    /// Proposed business column values
    pub values: BTreeMap<String, String>,
    /// `status_data`, the change kind
    pub status_data: i64,
    /// `status_approve`: 0 open, 1 approved, -1 rejected
    pub status_approve: i64,
    /// `note_create`, written by the submitter
    pub note_create: Option<String>,
    /// `note_approve`, written by the reviewer
    pub note_approve: Option<String>,
}

impl ShadowRow {
    /// Value of a business column
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// Row of the trash table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashRow {
    /// The deleted main row
    pub row: MainRow,
    /// Whether the deleting user was recorded
    pub stamped: bool,
}

/// Request values and linkage carried through one transition
#[derive(Default)]
struct Exchange<'r> {
    values: &'r [(&'r str, &'r str)],
    note: Option<&'r str>,
    key: Option<i64>,
    linked: i64,
    inserted_shadow: Option<i64>,
}

/// Main, shadow and trash tables for one entity
#[derive(Debug, Clone)]
pub struct RecordStore {
    policy: ApprovalPolicy,
    pk: String,
    columns: BTreeMap<&'static str, Vec<String>>,
    main: BTreeMap<i64, MainRow>,
    shadow: BTreeMap<i64, ShadowRow>,
    trash: Vec<TrashRow>,
    next_main: i64,
    next_shadow: i64,
}

impl RecordStore {
    /// Create an empty store for the entity of `ctx`
    #[must_use]
    pub fn new(ctx: &GenerationContext) -> Self {
        let pk = ctx.pk().to_string();
        let columns = [
            ("insert", FieldSet::Insert),
            ("update", FieldSet::Update),
        ]
        .into_iter()
        .map(|(name, set)| {
            let names = ctx
                .fields_in(set)
                .filter(|field| field.name != pk)
                .map(|field| field.name.clone())
                .collect();
            (name, names)
        })
        .collect();

        Self {
            policy: ApprovalPolicy::from(ctx.options()),
            pk,
            columns,
            main: BTreeMap::new(),
            shadow: BTreeMap::new(),
            trash: Vec::new(),
            next_main: 1,
            next_shadow: 1,
        }
    }

    /// Primary key column
    #[must_use]
    pub fn key_column(&self) -> &str {
        &self.pk
    }

    /// Main row by key
    #[must_use]
    pub fn main(&self, id: i64) -> Option<&MainRow> {
        self.main.get(&id)
    }

    /// Shadow row by id
    #[must_use]
    pub fn shadow(&self, apv_id: i64) -> Option<&ShadowRow> {
        self.shadow.get(&apv_id)
    }

    /// Shadow rows in insertion order
    pub fn shadows(&self) -> impl Iterator<Item = &ShadowRow> {
        self.shadow.values()
    }

    /// Archived rows
    #[must_use]
    pub fn trash(&self) -> &[TrashRow] {
        &self.trash
    }

    /// Create a record; returns the new key
    pub fn create(&mut self, values: &[(&str, &str)]) -> i64 {
        self.create_with_note(values, None)
    }

    /// Create a record with a submitter note; returns the new key
    pub fn create_with_note(&mut self, values: &[(&str, &str)], note: Option<&str>) -> i64 {
        let step = transition(self.policy, RecordState::NONE, Action::Create);
        let mut exchange = Exchange {
            values,
            note,
            ..Exchange::default()
        };
        self.apply(&step, &mut exchange);
        exchange.key.unwrap_or_default()
    }

    /// Change a record's values
    pub fn update(&mut self, id: i64, values: &[(&str, &str)]) -> Option<Transition> {
        self.run(id, Action::Update, values, None)
    }

    /// Change a record's values with a submitter note
    pub fn update_with_note(
        &mut self,
        id: i64,
        values: &[(&str, &str)],
        note: Option<&str>,
    ) -> Option<Transition> {
        self.run(id, Action::Update, values, note)
    }

    /// Activate or deactivate a record
    pub fn set_active(&mut self, id: i64, active: bool) -> Option<Transition> {
        self.run(id, Action::SetActive(active), &[], None)
    }

    /// Delete a record
    pub fn delete(&mut self, id: i64) -> Option<Transition> {
        self.run(id, Action::Delete, &[], None)
    }

    /// Approve the pending change of a record
    pub fn approve(&mut self, id: i64, note: Option<&str>) -> Option<Transition> {
        self.run(id, Action::Approve, &[], note)
    }

    /// Reject the pending change of a record
    pub fn reject(&mut self, id: i64, note: Option<&str>) -> Option<Transition> {
        self.run(id, Action::Reject, &[], note)
    }

    /// Run an action on an existing row; `None` when the row does not exist
    fn run(
        &mut self,
        id: i64,
        action: Action,
        values: &[(&str, &str)],
        note: Option<&str>,
    ) -> Option<Transition> {
        let row = self.main.get(&id)?;
        let mut exchange = Exchange {
            values,
            note,
            key: Some(id),
            linked: row.apv_id,
            inserted_shadow: None,
        };
        let step = transition(self.policy, row.state(), action);
        self.apply(&step, &mut exchange);
        Some(step)
    }

    fn apply(&mut self, step: &Transition, exchange: &mut Exchange<'_>) {
        for effect in &step.effects {
            tracing::trace!(?effect, key = ?exchange.key, "applying side effect");
            self.effect(*effect, exchange);
        }
    }

    fn request_values(&self, set: FieldSet, exchange: &Exchange<'_>) -> BTreeMap<String, String> {
        let name = match set {
            FieldSet::Update => "update",
            _ => "insert",
        };
        let allowed = self.columns.get(name).map(Vec::as_slice).unwrap_or_default();
        exchange
            .values
            .iter()
            .filter(|(column, _)| allowed.iter().any(|name| name.as_str() == *column))
            .map(|(column, value)| ((*column).to_string(), (*value).to_string()))
            .collect()
    }

    fn effect(&mut self, effect: SideEffect, exchange: &mut Exchange<'_>) {
        match effect {
            SideEffect::InsertShadow { columns, kind } => {
                let apv_id = self.next_shadow;
                self.next_shadow += 1;
                let row = ShadowRow {
                    apv_id,
                    key: exchange.key,
                    values: self.request_values(columns, exchange),
                    status_data: kind.code(),
                    status_approve: 0,
                    note_create: self.note(exchange),
                    note_approve: None,
                };
                self.shadow.insert(apv_id, row);
                exchange.inserted_shadow = Some(apv_id);
            }
            SideEffect::InsertMain {
                columns,
                draft,
                waiting_for,
                link,
            } => {
                let id = self.next_main;
                self.next_main += 1;
                let apv_id = match link {
                    ApvLink::None => 0,
                    ApvLink::FlagOnly => FLAG_ONLY_ID,
                    ApvLink::Shadow => exchange.inserted_shadow.unwrap_or_default(),
                };
                let row = MainRow {
                    id,
                    values: self.request_values(columns, exchange),
                    apv_id,
                    waiting_for: waiting_for.code(),
                    draft,
                    active: true,
                };
                self.main.insert(id, row);
                exchange.key = Some(id);
                exchange.linked = apv_id;
            }
            SideEffect::BindShadowKey => {
                if let Some(shadow) = exchange
                    .inserted_shadow
                    .and_then(|apv_id| self.shadow.get_mut(&apv_id))
                {
                    shadow.key = exchange.key;
                }
            }
            SideEffect::UpdateMain { columns } => {
                let values = self.request_values(columns, exchange);
                if let Some(row) = self.main_row(exchange) {
                    row.values.extend(values);
                }
            }
            SideEffect::MarkPending { waiting_for, link } => {
                let apv_id = match link {
                    ApvLink::None => 0,
                    ApvLink::FlagOnly => FLAG_ONLY_ID,
                    ApvLink::Shadow => exchange.inserted_shadow.unwrap_or_default(),
                };
                // guarded: a row with a pending change is left alone
                if let Some(row) = self.main_row(exchange).filter(|row| row.apv_id == 0) {
                    row.apv_id = apv_id;
                    row.waiting_for = waiting_for.code();
                }
            }
            SideEffect::CopyFromShadow { columns } => {
                let name = match columns {
                    FieldSet::Update => "update",
                    _ => "insert",
                };
                let proposed: BTreeMap<String, String> = self
                    .shadow
                    .get(&exchange.linked)
                    .map(|shadow| {
                        let allowed = self.columns.get(name).map(Vec::as_slice).unwrap_or_default();
                        shadow
                            .values
                            .iter()
                            .filter(|(column, _)| allowed.contains(*column))
                            .map(|(column, value)| (column.clone(), value.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                if let Some(row) = self.main_row(exchange) {
                    row.values.extend(proposed);
                }
            }
            SideEffect::SetActive(active) => {
                if let Some(row) = self.main_row(exchange) {
                    row.active = active;
                }
            }
            SideEffect::ClearPending { draft } => {
                if let Some(row) = self.main_row(exchange) {
                    row.apv_id = 0;
                    row.waiting_for = 0;
                    if draft {
                        row.draft = false;
                    }
                }
            }
            SideEffect::StampShadow(verdict) => {
                let note = self.note(exchange);
                if let Some(shadow) = self.shadow.get_mut(&exchange.linked) {
                    shadow.status_approve = verdict.code();
                    shadow.note_approve = note;
                }
            }
            SideEffect::DeleteMain => {
                let removed = exchange.key.and_then(|id| self.main.remove(&id));
                // the host library moves deleted rows into an existing trash table
                if let Some(row) = removed.filter(|_| self.policy.with_trash) {
                    self.trash.push(TrashRow {
                        row,
                        stamped: false,
                    });
                }
            }
            SideEffect::ArchiveToTrash => {
                if let Some(archived) = self
                    .trash
                    .iter_mut()
                    .rev()
                    .find(|archived| Some(archived.row.id) == exchange.key)
                {
                    archived.stamped = true;
                }
            }
        }
    }

    fn note(&self, exchange: &Exchange<'_>) -> Option<String> {
        self.policy
            .with_note
            .then(|| exchange.note.map(str::to_string))
            .flatten()
    }

    fn main_row(&mut self, exchange: &Exchange<'_>) -> Option<&mut MainRow> {
        exchange.key.and_then(|id| self.main.get_mut(&id))
    }
}
