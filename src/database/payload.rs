use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer};

use crate::{
    constants::{
        PASSWORD_MIN_LENGTH, PLACEHOLDER_AUTHOR_EMAIL, PLACEHOLDER_AUTHOR_USERNAME,
        RECIPE_NAME_MAX_LENGTH,
    },
    error::ValidationError,
    schema::Id,
};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Body of `POST /recipes`
#[derive(Deserialize, Debug, Clone)]
pub struct RecipePayload {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub image: Option<String>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Body of `PUT`/`PATCH /recipes/{id}`.
///
/// Absent fields are left untouched. A present `tags` or `ingredients` list
/// replaces the whole association set, `"image": null` removes the image.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

// Missing stays `None`, an explicit null becomes `Some(None)`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RecipePayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_text(&self.text)?;
        validate_cooking_time(self.cooking_time)?;
        validate_ingredients(&self.ingredients)
    }
}

impl RecipePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(text) = &self.text {
            validate_text(text)?;
        }
        if let Some(cooking_time) = self.cooking_time {
            validate_cooking_time(cooking_time)?;
        }
        if let Some(ingredients) = &self.ingredients {
            validate_ingredients(ingredients)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name", "This field may not be blank"));
    }
    if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        return Err(ValidationError::new(
            "name",
            &format!("Ensure this field has no more than {RECIPE_NAME_MAX_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("text", "This field may not be blank"));
    }
    Ok(())
}

fn validate_cooking_time(cooking_time: i32) -> Result<(), ValidationError> {
    if cooking_time < 1 {
        return Err(ValidationError::new(
            "cooking_time",
            "Ensure this value is greater than or equal to 1",
        ));
    }
    Ok(())
}

fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), ValidationError> {
    if ingredients.iter().any(|line| line.amount < 1) {
        return Err(ValidationError::new(
            "ingredients",
            "Ensure every amount is greater than or equal to 1",
        ));
    }
    Ok(())
}

/// Collapses repeated ingredient ids. The last amount given for an id wins,
/// the id keeps the position of its first occurrence.
pub fn dedup_ingredients(ingredients: &[IngredientAmount]) -> Vec<IngredientAmount> {
    let lines: IndexMap<Id, i32> = ingredients
        .iter()
        .map(|line| (line.id, line.amount))
        .collect();

    lines
        .into_iter()
        .map(|(id, amount)| IngredientAmount { id, amount })
        .collect()
}

pub fn dedup_tags(tags: &[Id]) -> Vec<Id> {
    tags.iter()
        .copied()
        .collect::<IndexSet<Id>>()
        .into_iter()
        .collect()
}

/// Body of `POST /users`
#[derive(Deserialize, Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("email", &self.email),
            ("username", &self.username),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::new(field, "This field may not be blank"));
            }
        }
        if self.username.trim().eq_ignore_ascii_case(PLACEHOLDER_AUTHOR_USERNAME) {
            return Err(ValidationError::new("username", "This username is reserved"));
        }
        if self.email.trim().eq_ignore_ascii_case(PLACEHOLDER_AUTHOR_EMAIL) {
            return Err(ValidationError::new("email", "This email address is reserved"));
        }
        if !self.email.contains('@') {
            return Err(ValidationError::new("email", "Enter a valid email address"));
        }
        if self.password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(ValidationError::new(
                "password",
                &format!("Ensure this field has at least {PASSWORD_MIN_LENGTH} characters"),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Entry of the ingredient import file, `[{"name": .., "measurement_unit": ..}]`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RecipePayload {
        RecipePayload {
            name: String::from("Pancakes"),
            text: String::from("Mix and fry"),
            cooking_time: 15,
            image: None,
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmount { id: 1, amount: 200 },
                IngredientAmount { id: 2, amount: 5 },
            ],
        }
    }

    #[test]
    fn accepts_valid_payload() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn rejects_zero_cooking_time() {
        let mut payload = payload();
        payload.cooking_time = 0;

        let error = payload.validate().unwrap_err();
        assert_eq!(error.field, "cooking_time");
    }

    #[test]
    fn rejects_zero_amount_anywhere_in_payload() {
        let mut payload = payload();
        payload.ingredients.push(IngredientAmount { id: 3, amount: 0 });

        let error = payload.validate().unwrap_err();
        assert_eq!(error.field, "ingredients");
    }

    #[test]
    fn rejects_blank_and_overlong_names() {
        let mut payload = payload();
        payload.name = String::from("   ");
        assert_eq!(payload.validate().unwrap_err().field, "name");

        payload.name = "a".repeat(RECIPE_NAME_MAX_LENGTH + 1);
        assert_eq!(payload.validate().unwrap_err().field, "name");
    }

    #[test]
    fn patch_only_checks_present_fields() {
        assert!(RecipePatch::default().validate().is_ok());

        let patch = RecipePatch {
            cooking_time: Some(0),
            ..Default::default()
        };
        assert_eq!(patch.validate().unwrap_err().field, "cooking_time");

        let patch = RecipePatch {
            ingredients: Some(vec![IngredientAmount { id: 1, amount: 0 }]),
            ..Default::default()
        };
        assert_eq!(patch.validate().unwrap_err().field, "ingredients");
    }

    #[test]
    fn duplicate_ingredients_keep_last_amount() {
        let lines = dedup_ingredients(&[
            IngredientAmount { id: 4, amount: 100 },
            IngredientAmount { id: 7, amount: 2 },
            IngredientAmount { id: 4, amount: 300 },
        ]);

        assert_eq!(
            lines,
            vec![
                IngredientAmount { id: 4, amount: 300 },
                IngredientAmount { id: 7, amount: 2 },
            ]
        );
    }

    #[test]
    fn duplicate_tags_collapse() {
        assert_eq!(dedup_tags(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn patch_distinguishes_absent_from_empty_lists() {
        let patch: RecipePatch = serde_json::from_str(r#"{"name": "Soup"}"#).unwrap();
        assert!(patch.ingredients.is_none());
        assert!(patch.tags.is_none());

        let patch: RecipePatch = serde_json::from_str(r#"{"tags": []}"#).unwrap();
        assert_eq!(patch.tags, Some(vec![]));
    }

    #[test]
    fn patch_distinguishes_absent_from_null_image() {
        let patch: RecipePatch = serde_json::from_str(r#"{"name": "Soup"}"#).unwrap();
        assert_eq!(patch.image, None);

        let patch: RecipePatch = serde_json::from_str(r#"{"image": null}"#).unwrap();
        assert_eq!(patch.image, Some(None));

        let patch: RecipePatch = serde_json::from_str(r#"{"image": "soup.png"}"#).unwrap();
        assert_eq!(patch.image, Some(Some(String::from("soup.png"))));
    }

    #[test]
    fn new_user_password_length() {
        let user = NewUser {
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: String::from("short"),
        };
        assert_eq!(user.validate().unwrap_err().field, "password");
    }

    #[test]
    fn placeholder_identity_is_reserved() {
        let user = NewUser {
            email: String::from("cook@example.com"),
            username: String::from("Deleted"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: String::from("long enough"),
        };
        assert_eq!(user.validate().unwrap_err().field, "username");

        let user = NewUser {
            email: String::from("DELETED@localhost"),
            username: String::from("cook"),
            ..user
        };
        assert_eq!(user.validate().unwrap_err().field, "email");
    }
}
