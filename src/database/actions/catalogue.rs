use serde::{Deserialize, Serialize};

use crate::{
    authentication::permissions::ActionType,
    error::{CoreError, ErrorKind},
    jwt::SessionData,
    schema::{Id, Ingredient, NewIngredient, NewTag, Tag},
    store::EntityStore,
    validation::{validate_ingredient, validate_tag},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogueKind {
    Ingredients,
    Tags,
}

fn first_created<T>(mut rows: Vec<T>) -> Result<T, CoreError> {
    rows.pop()
        .ok_or_else(|| CoreError::storage("Insert returned no rows".to_owned()))
}

pub async fn create_tag(
    tag: NewTag,
    session: &SessionData,
    store: &impl EntityStore,
) -> Result<Tag, CoreError> {
    session.authenticate(ActionType::ManageCatalogue)?;
    validate_tag(&tag)?;

    let tag = first_created(store.insert_tags(&[tag]).await?)?;
    log::info!("Created tag {} ({})", tag.id, tag.slug);
    Ok(tag)
}

pub async fn create_ingredient(
    ingredient: NewIngredient,
    session: &SessionData,
    store: &impl EntityStore,
) -> Result<Ingredient, CoreError> {
    session.authenticate(ActionType::ManageCatalogue)?;
    validate_ingredient(&ingredient)?;

    let ingredient = first_created(store.insert_ingredients(&[ingredient]).await?)?;
    log::info!("Created ingredient {} ({})", ingredient.id, ingredient.name);
    Ok(ingredient)
}

pub async fn list_tags(store: &impl EntityStore) -> Result<Vec<Tag>, CoreError> {
    store.list_tags().await
}

pub async fn get_tag(tag_id: Id, store: &impl EntityStore) -> Result<Tag, CoreError> {
    store
        .get_tag(tag_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No tag exists with specified id"))
}

pub async fn get_ingredient(
    ingredient_id: Id,
    store: &impl EntityStore,
) -> Result<Ingredient, CoreError> {
    store
        .get_ingredient(ingredient_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No ingredient exists with specified id"))
}

/// Ingredients whose name starts with `prefix`, ignoring case. No prefix lists everything.
pub async fn search_ingredients(
    prefix: Option<&str>,
    store: &impl EntityStore,
) -> Result<Vec<Ingredient>, CoreError> {
    let prefix = prefix.map(str::trim).filter(|p| !p.is_empty());
    store.search_ingredients(prefix).await
}

fn parse_document<T: for<'de> Deserialize<'de>>(json: &str) -> Result<Vec<T>, CoreError> {
    serde_json::from_str(json)
        .map_err(|e| CoreError::new(ErrorKind::Validation, format!("Invalid catalogue: {e}")))
}

/// Loads a JSON array of ingredients (`name`, `measurement_unit`) or tags
/// (`name`, `color`, `slug`). Every entry is validated before any is written
/// and the document is stored as a whole or not at all.
pub async fn import_catalogue(
    kind: CatalogueKind,
    json: &str,
    store: &impl EntityStore,
) -> Result<usize, CoreError> {
    let imported = match kind {
        CatalogueKind::Ingredients => {
            let ingredients: Vec<NewIngredient> = parse_document(json)?;
            for (i, ingredient) in ingredients.iter().enumerate() {
                validate_ingredient(ingredient).map_err(|e| {
                    CoreError::new(e.kind(), format!("Entry {i}: {}", e.info()))
                })?;
            }
            store.insert_ingredients(&ingredients).await?.len()
        }
        CatalogueKind::Tags => {
            let tags: Vec<NewTag> = parse_document(json)?;
            for (i, tag) in tags.iter().enumerate() {
                validate_tag(tag).map_err(|e| {
                    CoreError::new(e.kind(), format!("Entry {i}: {}", e.info()))
                })?;
            }
            store.insert_tags(&tags).await?.len()
        }
    };

    log::info!("Imported {imported} {kind:?}");
    Ok(imported)
}
