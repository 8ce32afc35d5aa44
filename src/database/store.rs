use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::CoreError,
    schema::{
        CartLine, Id, Ingredient, IngredientAmount, IngredientAmountInput, NewIngredient, NewTag,
        NewUser, Recipe, RelationKind, Tag, User,
    },
};

/// A validated recipe: the scalar fields plus the full tag set and ingredient-line
/// set that replace whatever the recipe had before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tag_ids: Vec<Id>,
    pub lines: Vec<IngredientAmountInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Tag slugs; a recipe matches when it carries any of them.
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

/// Durable storage for every entity and relation.
///
/// `insert_recipe`, `replace_recipe`, `delete_recipe`, `insert_tags` and
/// `insert_ingredients` are each one atomic unit: either every row they touch is
/// written or none is. `insert_relation` is the final arbiter of relation
/// uniqueness and reports a duplicate by returning `false`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn insert_user(&self, user: &NewUser, password_hash: &str) -> Result<User, CoreError>;
    async fn get_user(&self, id: Id) -> Result<Option<User>, CoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError>;

    async fn insert_tags(&self, tags: &[NewTag]) -> Result<Vec<Tag>, CoreError>;
    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, CoreError>;
    async fn list_tags(&self) -> Result<Vec<Tag>, CoreError>;

    async fn insert_ingredients(
        &self,
        ingredients: &[NewIngredient],
    ) -> Result<Vec<Ingredient>, CoreError>;
    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, CoreError>;
    async fn search_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, CoreError>;

    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Recipe, CoreError>;
    async fn replace_recipe(&self, recipe_id: Id, draft: &RecipeDraft) -> Result<Recipe, CoreError>;
    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, CoreError>;
    async fn get_recipe(&self, recipe_id: Id) -> Result<Option<Recipe>, CoreError>;
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
    ) -> Result<Vec<Recipe>, CoreError>;
    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, CoreError>;
    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, CoreError>;
    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, CoreError>;
    async fn list_recipe_ingredients(&self, recipe_id: Id)
        -> Result<Vec<IngredientAmount>, CoreError>;

    async fn relation_exists(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError>;
    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError>;
    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError>;
    async fn list_relation_targets(
        &self,
        kind: RelationKind,
        user_id: Id,
    ) -> Result<Vec<Id>, CoreError>;

    /// Every ingredient line of every recipe in the user's cart, ungrouped.
    async fn list_cart_lines(&self, user_id: Id) -> Result<Vec<CartLine>, CoreError>;
}

/// First id of `requested` that is absent from `found`.
pub fn first_missing(requested: &[Id], found: &[Id]) -> Option<Id> {
    requested.iter().copied().find(|id| !found.contains(id))
}
