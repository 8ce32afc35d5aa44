use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

/// The three toggle relations. Each one pairs a user with a target entity.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize, Eq, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Follow,
    Favorite,
    CartItem,
}

impl RelationKind {
    pub fn table(&self) -> &'static str {
        match self {
            RelationKind::Follow => "follows",
            RelationKind::Favorite => "favorites",
            RelationKind::CartItem => "cart_items",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            RelationKind::Follow => "following_id",
            RelationKind::Favorite | RelationKind::CartItem => "recipe_id",
        }
    }

    pub fn constraint(&self) -> &'static str {
        match self {
            RelationKind::Follow => "follow_user",
            RelationKind::Favorite => "favorite_recipe",
            RelationKind::CartItem => "shopping_cart_recipe",
        }
    }

    pub fn from_constraint(name: &str) -> Option<Self> {
        [Self::Follow, Self::Favorite, Self::CartItem]
            .into_iter()
            .find(|kind| kind.constraint() == name)
    }

    /// Follow targets users, the others target recipes.
    pub fn targets_user(&self) -> bool {
        matches!(self, RelationKind::Follow)
    }

    pub fn already_exists_message(&self) -> &'static str {
        match self {
            RelationKind::Follow => "You are already subscribed to this author",
            RelationKind::Favorite => "Recipe is already in favorites",
            RelationKind::CartItem => "Recipe is already in the shopping cart",
        }
    }

    pub fn missing_message(&self) -> &'static str {
        match self {
            RelationKind::Follow => "You were not subscribed to this author",
            RelationKind::Favorite => "Recipe is not in favorites",
            RelationKind::CartItem => "Recipe is not in the shopping cart",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientLine {
    pub id: Id,
    pub recipe_id: Id,
    pub ingredient_id: Id,
    pub amount: i32,
}

/// An ingredient line joined with its ingredient; `id` is the ingredient id.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientAmount {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub user_id: Id,
    pub target_id: Id,
}

/// One ingredient line of a recipe in somebody's cart, before aggregation.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingRow {
    pub position: usize,
    pub name: String,
    pub amount: i64,
    pub measurement_unit: String,
}

// Payloads

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmountInput {
    pub id: Id,
    pub amount: i32,
}

impl From<(Id, i32)> for IngredientAmountInput {
    fn from((id, amount): (Id, i32)) -> Self {
        Self { id, amount }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipePayload {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmountInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialRecipePayload {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmountInput>>,
}

// Views

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<IngredientAmount>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeShort {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeShort {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RelationView {
    Recipe(RecipeShort),
    Author(AuthorView),
}
