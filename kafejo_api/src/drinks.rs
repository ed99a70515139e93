//! The drink menu and its in-memory store

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single ingredient in a drink recipe
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// What the ingredient is
    pub name: String,
    /// Display color used when rendering the drink graphic
    pub color: String,
    /// Relative portion of the drink taken up by this ingredient
    pub parts: u32,
}

/// A drink on the menu
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drink {
    pub id: u32,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl Drink {
    /// The abbreviated public representation, which omits ingredient names
    pub fn summary(&self) -> DrinkSummary {
        DrinkSummary {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|i| IngredientSummary {
                    color: i.color.clone(),
                    parts: i.parts,
                })
                .collect(),
        }
    }
}

/// A drink with its recipe reduced to colors and proportions
///
/// This is what unauthenticated patrons see. The full ingredient list
/// stays behind the `get:drinks-detail` permission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DrinkSummary {
    pub id: u32,
    pub title: String,
    pub recipe: Vec<IngredientSummary>,
}

/// An ingredient stripped down to its visual proportions
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngredientSummary {
    pub color: String,
    pub parts: u32,
}

/// An error produced by a menu store operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MenuError {
    /// Another drink already uses the requested title
    #[error("title must be unique")]
    DuplicateTitle,

    /// No drink has the requested id
    #[error("drink not found")]
    NotFound,
}

#[derive(Debug)]
struct MenuState {
    drinks: Vec<Drink>,
    next_id: u32,
}

/// The in-memory menu
///
/// Titles are unique across the menu and ids are assigned sequentially,
/// never reused. The store starts seeded with a single glass of water so
/// a fresh deployment has something to serve.
#[derive(Debug)]
pub struct MenuStore {
    state: RwLock<MenuState>,
}

impl MenuStore {
    pub fn new() -> Self {
        let water = Drink {
            id: 1,
            title: String::from("water"),
            recipe: vec![Ingredient {
                name: String::from("water"),
                color: String::from("blue"),
                parts: 1,
            }],
        };

        Self {
            state: RwLock::new(MenuState {
                drinks: vec![water],
                next_id: 2,
            }),
        }
    }

    /// All drinks on the menu, in insertion order
    pub fn list(&self) -> Vec<Drink> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.drinks.clone()
    }

    /// Looks up a single drink by id
    pub fn get(&self, id: u32) -> Result<Drink, MenuError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .drinks
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(MenuError::NotFound)
    }

    /// Adds a new drink to the menu
    pub fn create(&self, title: String, recipe: Vec<Ingredient>) -> Result<Drink, MenuError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.drinks.iter().any(|d| d.title == title) {
            return Err(MenuError::DuplicateTitle);
        }

        let drink = Drink {
            id: state.next_id,
            title,
            recipe,
        };
        state.next_id += 1;
        state.drinks.push(drink.clone());
        Ok(drink)
    }

    /// Retitles a drink, optionally replacing its recipe as well
    ///
    /// A drink may keep its current title; only collisions with _other_
    /// drinks are rejected.
    pub fn update(
        &self,
        id: u32,
        title: String,
        recipe: Option<Vec<Ingredient>>,
    ) -> Result<Drink, MenuError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.drinks.iter().any(|d| d.id != id && d.title == title) {
            return Err(MenuError::DuplicateTitle);
        }

        let drink = state
            .drinks
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(MenuError::NotFound)?;

        drink.title = title;
        if let Some(recipe) = recipe {
            drink.recipe = recipe;
        }
        Ok(drink.clone())
    }

    /// Removes a drink from the menu
    pub fn delete(&self, id: u32) -> Result<(), MenuError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let idx = state
            .drinks
            .iter()
            .position(|d| d.id == id)
            .ok_or(MenuError::NotFound)?;
        state.drinks.remove(idx);
        Ok(())
    }
}

impl Default for MenuStore {
    fn default() -> Self {
        Self::new()
    }
}
