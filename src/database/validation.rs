use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        CATALOGUE_NAME_MAX_LENGTH, EMAIL_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH, TAG_SLUG_MAX_LENGTH,
        USER_NAME_MAX_LENGTH,
    },
    error::{CoreError, ErrorKind},
    schema::{
        Id, NewIngredient, NewTag, NewUser, PartialRecipePayload, RecipePayload,
    },
    store::RecipeDraft,
};

/// Bounds applied to `cooking_time` and ingredient `amount`. The lower bound is
/// never below 1; the upper bound is a deployment policy and may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueLimits {
    pub min: i32,
    pub max: Option<i32>,
}

impl Default for ValueLimits {
    fn default() -> Self {
        Self { min: 1, max: None }
    }
}

impl ValueLimits {
    pub fn new(min: i32, max: Option<i32>) -> Self {
        Self {
            min: min.max(1),
            max,
        }
    }

    pub fn check(&self, field: &str, value: i32) -> Result<(), CoreError> {
        if value < self.min {
            return Err(CoreError::new(
                ErrorKind::Validation,
                format!("{field} must be at least {}", self.min),
            ));
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(CoreError::new(
                    ErrorKind::Validation,
                    format!("{field} must be at most {max}"),
                ));
            }
        }
        Ok(())
    }
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"))
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#[0-9a-fA-F]{3}([0-9a-fA-F]{3})?$").expect("valid color pattern")
    })
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"))
}

fn require_text(field: &str, value: &str, max_length: Option<usize>) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::new(
            ErrorKind::Validation,
            format!("{field} may not be blank"),
        ));
    }
    if let Some(max_length) = max_length {
        if value.chars().count() > max_length {
            return Err(CoreError::new(
                ErrorKind::Validation,
                format!("{field} may not be longer than {max_length} characters"),
            ));
        }
    }
    Ok(())
}

/// Checks a full recipe payload before anything is written and turns it into
/// the draft the store persists.
pub fn validate_recipe(payload: &RecipePayload, limits: &ValueLimits) -> Result<RecipeDraft, CoreError> {
    require_text("name", &payload.name, Some(RECIPE_NAME_MAX_LENGTH))?;
    require_text("text", &payload.text, None)?;
    require_text("image", &payload.image, None)?;
    limits.check("cooking_time", payload.cooking_time)?;

    if payload.ingredients.is_empty() {
        return Err(ErrorKind::Validation.new("Recipe needs at least one ingredient"));
    }

    let mut seen = HashSet::new();
    let mut lines = Vec::with_capacity(payload.ingredients.len());
    for line in payload.ingredients.iter() {
        if !seen.insert(line.id) {
            return Err(ErrorKind::Validation.new("duplicate ingredient"));
        }
        limits.check("amount", line.amount)?;
        lines.push(line.clone());
    }

    Ok(RecipeDraft {
        name: payload.name.trim().to_owned(),
        image: payload.image.to_owned(),
        text: payload.text.to_owned(),
        cooking_time: payload.cooking_time,
        tag_ids: dedup_ids(&payload.tags),
        lines,
    })
}

/// Fills the fields a partial payload leaves out from the current state of the recipe.
pub fn merge_partial(payload: &PartialRecipePayload, current: RecipeDraft) -> RecipePayload {
    RecipePayload {
        name: payload.name.clone().unwrap_or(current.name),
        image: payload.image.clone().unwrap_or(current.image),
        text: payload.text.clone().unwrap_or(current.text),
        cooking_time: payload.cooking_time.unwrap_or(current.cooking_time),
        tags: payload.tags.clone().unwrap_or(current.tag_ids),
        ingredients: payload.ingredients.clone().unwrap_or(current.lines),
    }
}

/// Tags form a set: repeated ids collapse and first-seen order is kept.
pub fn dedup_ids(ids: &[Id]) -> Vec<Id> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

pub fn validate_tag(tag: &NewTag) -> Result<(), CoreError> {
    require_text("name", &tag.name, Some(CATALOGUE_NAME_MAX_LENGTH))?;
    if tag.slug.chars().count() > TAG_SLUG_MAX_LENGTH || !slug_pattern().is_match(&tag.slug) {
        return Err(CoreError::new(
            ErrorKind::Validation,
            format!("Invalid slug: {:?}", tag.slug),
        ));
    }
    if !color_pattern().is_match(&tag.color) {
        return Err(CoreError::new(
            ErrorKind::Validation,
            format!("Invalid HEX color: {:?}", tag.color),
        ));
    }
    Ok(())
}

pub fn validate_ingredient(ingredient: &NewIngredient) -> Result<(), CoreError> {
    require_text("name", &ingredient.name, Some(CATALOGUE_NAME_MAX_LENGTH))?;
    require_text(
        "measurement_unit",
        &ingredient.measurement_unit,
        Some(CATALOGUE_NAME_MAX_LENGTH),
    )
}

pub fn validate_user(user: &NewUser) -> Result<(), CoreError> {
    require_text("email", &user.email, Some(EMAIL_MAX_LENGTH))?;
    if !user.email.contains('@') {
        return Err(ErrorKind::Validation.new("Enter a valid email address"));
    }
    require_text("username", &user.username, Some(USER_NAME_MAX_LENGTH))?;
    if !username_pattern().is_match(&user.username) {
        return Err(ErrorKind::Validation.new("Username contains invalid characters"));
    }
    require_text("first_name", &user.first_name, Some(USER_NAME_MAX_LENGTH))?;
    require_text("last_name", &user.last_name, Some(USER_NAME_MAX_LENGTH))?;
    require_text("password", &user.password, None)
}
