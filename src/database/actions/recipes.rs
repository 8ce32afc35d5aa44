use crate::{
    actions::users::user_view,
    authentication::permissions::ActionType,
    error::{CoreError, ErrorKind},
    jwt::SessionData,
    operations::{ActionTable, RecipeAction, RecipeInput},
    schema::{
        Id, IngredientAmountInput, PartialRecipePayload, Recipe, RecipeDetail, RecipePayload,
        RelationKind,
    },
    store::{EntityStore, RecipeDraft, RecipeFilter},
};

async fn get_recipe(recipe_id: Id, store: &impl EntityStore) -> Result<Recipe, CoreError> {
    store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No recipe exists with specified id"))
}

/// Returns the recipe if the session may modify it: its author, or anybody allowed
/// to manage all recipes.
pub async fn get_recipe_mut(
    recipe_id: Id,
    session: &SessionData,
    store: &impl EntityStore,
) -> Result<Recipe, CoreError> {
    let recipe = get_recipe(recipe_id, store).await?;

    if recipe.author_id == session.user_id {
        session.authenticate(ActionType::ManageOwnRecipes)?;
    } else {
        session.authenticate(ActionType::ManageAllRecipes)?;
    }

    Ok(recipe)
}

/// Joins a recipe row with its author, tags, ingredient lines and the viewer's relations.
pub async fn load_recipe_detail(
    recipe: Recipe,
    viewer: Option<Id>,
    store: &impl EntityStore,
) -> Result<RecipeDetail, CoreError> {
    let author = store
        .get_user(recipe.author_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("Recipe author doesn't exist"))?;
    let author = user_view(author, viewer, store).await?;

    let tags = store.list_recipe_tags(recipe.id).await?;
    let ingredients = store.list_recipe_ingredients(recipe.id).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user) => (
            store
                .relation_exists(RelationKind::Favorite, user, recipe.id)
                .await?,
            store
                .relation_exists(RelationKind::CartItem, user, recipe.id)
                .await?,
        ),
        None => (false, false),
    };

    Ok(RecipeDetail {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    })
}

pub async fn get_recipe_detail(
    recipe_id: Id,
    viewer: Option<Id>,
    store: &impl EntityStore,
) -> Result<RecipeDetail, CoreError> {
    let recipe = get_recipe(recipe_id, store).await?;
    load_recipe_detail(recipe, viewer, store).await
}

/// Newest first. `is_favorited` and `is_in_shopping_cart` are ignored for anonymous viewers.
pub async fn list_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    store: &impl EntityStore,
) -> Result<Vec<RecipeDetail>, CoreError> {
    let recipes = store.list_recipes(filter, viewer).await?;
    log::trace!("Recipe filter {filter:?} matched {} recipes", recipes.len());

    let mut details = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        details.push(load_recipe_detail(recipe, viewer, store).await?);
    }
    Ok(details)
}

/// Creates the recipe, its tag links and its ingredient lines in one unit.
pub async fn create_recipe(
    author_id: Id,
    payload: RecipePayload,
    actions: &ActionTable,
    store: &impl EntityStore,
) -> Result<RecipeDetail, CoreError> {
    let draft = actions.prepare(RecipeAction::Create, RecipeInput::Full(payload))?;
    let recipe = store.insert_recipe(author_id, &draft).await?;

    log::info!("User {author_id} created recipe {}", recipe.id);
    load_recipe_detail(recipe, Some(author_id), store).await
}

/// Full replace of scalars, tags and ingredient lines. The caller checks
/// permission with `get_recipe_mut` first.
pub async fn update_recipe(
    recipe_id: Id,
    payload: RecipePayload,
    viewer: Id,
    actions: &ActionTable,
    store: &impl EntityStore,
) -> Result<RecipeDetail, CoreError> {
    let draft = actions.prepare(RecipeAction::Update, RecipeInput::Full(payload))?;
    let recipe = store.replace_recipe(recipe_id, &draft).await?;

    log::info!("User {viewer} updated recipe {recipe_id}");
    load_recipe_detail(recipe, Some(viewer), store).await
}

async fn current_draft(recipe: Recipe, store: &impl EntityStore) -> Result<RecipeDraft, CoreError> {
    let tags = store.list_recipe_tags(recipe.id).await?;
    let lines = store.list_recipe_ingredients(recipe.id).await?;

    Ok(RecipeDraft {
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        tag_ids: tags.into_iter().map(|tag| tag.id).collect(),
        lines: lines
            .into_iter()
            .map(|line| IngredientAmountInput {
                id: line.id,
                amount: line.amount,
            })
            .collect(),
    })
}

/// Omitted fields keep their stored value; tags and ingredients, when given,
/// replace the whole set.
pub async fn partial_update_recipe(
    recipe_id: Id,
    payload: PartialRecipePayload,
    viewer: Id,
    actions: &ActionTable,
    store: &impl EntityStore,
) -> Result<RecipeDetail, CoreError> {
    let current = current_draft(get_recipe(recipe_id, store).await?, store).await?;
    let draft = actions.prepare(
        RecipeAction::PartialUpdate,
        RecipeInput::Partial { payload, current },
    )?;
    let recipe = store.replace_recipe(recipe_id, &draft).await?;

    log::info!("User {viewer} partially updated recipe {recipe_id}");
    load_recipe_detail(recipe, Some(viewer), store).await
}

pub async fn delete_recipe(recipe_id: Id, store: &impl EntityStore) -> Result<(), CoreError> {
    if !store.delete_recipe(recipe_id).await? {
        return Err(ErrorKind::NotFound.new("No recipe exists with specified id"));
    }

    log::info!("Deleted recipe {recipe_id}");
    Ok(())
}
