pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const USER_NAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const CATALOGUE_NAME_MAX_LENGTH: usize = 150;
pub const TAG_SLUG_MAX_LENGTH: usize = 100;

pub const SESSION_TTL_MAX_HOURS: i64 = 24 * 366;

pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_cart.txt";
pub const SHOPPING_LIST_HEADERS: [&str; 4] = ["No.", "Name", "Amount", "Unit"];

pub const RECIPE_IMAGE_DIR: &str = "recipes";
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

// Constraint names as declared in migrations/
pub const INGREDIENT_LINE_CONSTRAINT: &str = "unique_ingredient";
pub const SELF_FOLLOW_CONSTRAINT: &str = "no_self_follow";
pub const TAG_SLUG_CONSTRAINT: &str = "tags_slug_key";
pub const USER_EMAIL_CONSTRAINT: &str = "users_email_key";
pub const USER_USERNAME_CONSTRAINT: &str = "users_username_key";
