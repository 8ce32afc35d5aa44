use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, ErrorKind},
    schema::{PartialRecipePayload, RecipePayload},
    store::RecipeDraft,
    validation::{merge_partial, validate_recipe, ValueLimits},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeAction {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
}

impl RecipeAction {
    pub const ALL: [RecipeAction; 5] = [
        RecipeAction::List,
        RecipeAction::Retrieve,
        RecipeAction::Create,
        RecipeAction::Update,
        RecipeAction::PartialUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeAction::List => "list",
            RecipeAction::Retrieve => "retrieve",
            RecipeAction::Create => "create",
            RecipeAction::Update => "update",
            RecipeAction::PartialUpdate => "partial_update",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputShape {
    /// Query parameters of a `RecipeFilter`.
    Filter,
    /// A recipe id and nothing else.
    Key,
    /// A complete `RecipePayload`.
    Payload,
    /// A `PartialRecipePayload` applied over the stored recipe.
    PartialPayload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputShape {
    DetailList,
    Detail,
}

pub enum RecipeInput {
    Full(RecipePayload),
    Partial {
        payload: PartialRecipePayload,
        current: RecipeDraft,
    },
}

type Prepare = fn(RecipeInput, &ValueLimits) -> Result<RecipeDraft, CoreError>;

pub struct ActionSpec {
    pub input: InputShape,
    pub output: OutputShape,
    prepare: Option<Prepare>,
}

fn prepare_full(input: RecipeInput, limits: &ValueLimits) -> Result<RecipeDraft, CoreError> {
    match input {
        RecipeInput::Full(payload) => validate_recipe(&payload, limits),
        RecipeInput::Partial { .. } => {
            Err(ErrorKind::Validation.new("A complete recipe payload is required"))
        }
    }
}

fn prepare_partial(input: RecipeInput, limits: &ValueLimits) -> Result<RecipeDraft, CoreError> {
    match input {
        RecipeInput::Full(payload) => validate_recipe(&payload, limits),
        RecipeInput::Partial { payload, current } => {
            validate_recipe(&merge_partial(&payload, current), limits)
        }
    }
}

/// Per-action input handling for recipes. Built once with the deployment's
/// value limits and handed to every recipe operation.
pub struct ActionTable {
    limits: ValueLimits,
    specs: [(RecipeAction, ActionSpec); 5],
}

impl ActionTable {
    pub fn new(limits: ValueLimits) -> Self {
        Self {
            limits,
            specs: [
                (
                    RecipeAction::List,
                    ActionSpec {
                        input: InputShape::Filter,
                        output: OutputShape::DetailList,
                        prepare: None,
                    },
                ),
                (
                    RecipeAction::Retrieve,
                    ActionSpec {
                        input: InputShape::Key,
                        output: OutputShape::Detail,
                        prepare: None,
                    },
                ),
                (
                    RecipeAction::Create,
                    ActionSpec {
                        input: InputShape::Payload,
                        output: OutputShape::Detail,
                        prepare: Some(prepare_full),
                    },
                ),
                (
                    RecipeAction::Update,
                    ActionSpec {
                        input: InputShape::Payload,
                        output: OutputShape::Detail,
                        prepare: Some(prepare_full),
                    },
                ),
                (
                    RecipeAction::PartialUpdate,
                    ActionSpec {
                        input: InputShape::PartialPayload,
                        output: OutputShape::Detail,
                        prepare: Some(prepare_partial),
                    },
                ),
            ],
        }
    }

    pub fn spec(&self, action: RecipeAction) -> &ActionSpec {
        self.specs
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, spec)| spec)
            .unwrap_or(&self.specs[0].1)
    }

    /// Validates the input of a writing action and returns the draft to persist.
    pub fn prepare(&self, action: RecipeAction, input: RecipeInput) -> Result<RecipeDraft, CoreError> {
        match self.spec(action).prepare {
            Some(prepare) => prepare(input, &self.limits),
            None => Err(CoreError::new(
                ErrorKind::Validation,
                format!("Action {} takes no recipe payload", action.as_str()),
            )),
        }
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::new(ValueLimits::default())
    }
}
