//! Machine recipes and the piece transformation table.
//!
//! A recipe starts from a raw piece and applies tools in order. Each
//! `(piece, tool)` pair maps to the resulting piece; following the table from
//! the initial piece tells which final piece a recipe produces.
//!
//! | Final piece | Initial | Tools            | Times (s)          |
//! |-------------|---------|------------------|--------------------|
//! | P3          | 1       | 1                | 20                 |
//! | P4          | 1       | 1, 2             | 20, 20             |
//! | P5          | 1       | 1, 2, 3          | 20, 20, 45         |
//! | P8          | 1       | 1, 2, 3, 4       | 20, 20, 45, 45     |
//! | P7          | 1       | 1, 2, 3, 6       | 20, 20, 45, 30     |
//! | P6          | 1       | 1, 2, 3, 4, 5    | 20, 20, 45, 45, 30 |
//! | P9          | 2       | 6                | 15                 |
//! | P10         | 2       | 6, 5             | 15, 20             |
//! | P11         | 2       | 6, 1             | 15, 30             |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Piece type number as used by the controller
pub type Piece = u8;

/// Tool number as used by the controller
pub type Tool = u8;

/// One machining step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Step {
    pub tool: Tool,
    /// Machining time in seconds
    pub seconds: u32,
}

/// Initial piece plus ordered machining steps
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Recipe {
    pub initial_piece: Piece,
    pub steps: Vec<Step>,
}

impl Recipe {
    pub fn new(initial_piece: Piece, tools: &[Tool], seconds: &[u32]) -> Self {
        let steps = tools
            .iter()
            .zip(seconds)
            .map(|(&tool, &seconds)| Step { tool, seconds })
            .collect();
        Self {
            initial_piece,
            steps,
        }
    }

    /// Values written to the controller, arrays fitted to `slots` entries
    pub fn payload(&self, slots: usize) -> RecipePayload {
        let mut tools: Vec<i16> = self.steps.iter().map(|s| i16::from(s.tool)).collect();
        let mut times_ms: Vec<i64> = self
            .steps
            .iter()
            .map(|s| i64::from(s.seconds) * 1000)
            .collect();
        tools.resize(slots, 0);
        times_ms.resize(slots, 0);

        RecipePayload {
            entry_piece: i16::from(self.initial_piece),
            steps: i16::try_from(self.steps.len()).unwrap_or(i16::MAX),
            tools,
            times_ms,
        }
    }
}

/// Controller-side encoding of a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipePayload {
    pub entry_piece: i16,
    /// Untruncated step count, saturating at `i16::MAX`
    pub steps: i16,
    pub tools: Vec<i16>,
    pub times_ms: Vec<i64>,
}

/// `(from, tool) -> to` entry of the transformation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transformation {
    pub from: Piece,
    pub tool: Tool,
    pub to: Piece,
}

/// Recipes indexed for lookup by final piece
#[derive(Debug, Clone)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
    table: HashMap<(Piece, Tool), Piece>,
}

impl RecipeBook {
    pub fn new(recipes: Vec<Recipe>, transformations: &[Transformation]) -> Self {
        let table = transformations
            .iter()
            .map(|t| ((t.from, t.tool), t.to))
            .collect();
        Self { recipes, table }
    }

    /// Final piece produced by `recipe`, or `None` if a step is not in the table
    pub fn simulate(&self, recipe: &Recipe) -> Option<Piece> {
        recipe
            .steps
            .iter()
            .try_fold(recipe.initial_piece, |current, step| {
                self.table.get(&(current, step.tool)).copied()
            })
    }

    /// First recipe producing `target`
    pub fn find_for(&self, target: Piece) -> Option<&Recipe> {
        self.recipes
            .iter()
            .find(|recipe| self.simulate(recipe) == Some(target))
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl Default for RecipeBook {
    fn default() -> Self {
        Self::new(default_recipes(), &default_transformations())
    }
}

/// Plant recipes, in lookup order
pub fn default_recipes() -> Vec<Recipe> {
    vec![
        Recipe::new(1, &[1], &[20]),
        Recipe::new(1, &[1, 2], &[20, 20]),
        Recipe::new(1, &[1, 2, 3], &[20, 20, 45]),
        Recipe::new(1, &[1, 2, 3, 4], &[20, 20, 45, 45]),
        Recipe::new(1, &[1, 2, 3, 6], &[20, 20, 45, 30]),
        Recipe::new(1, &[1, 2, 3, 4, 5], &[20, 20, 45, 45, 30]),
        Recipe::new(2, &[6], &[15]),
        Recipe::new(1, &[1, 2, 2], &[20, 20, 20]),
        Recipe::new(2, &[6, 5], &[15, 20]),
        Recipe::new(1, &[1, 2, 2, 5], &[20, 20, 20, 20]),
        Recipe::new(2, &[6, 1], &[15, 30]),
        Recipe::new(1, &[1, 2, 2, 1], &[20, 20, 20, 30]),
    ]
}

/// Plant transformation table
pub fn default_transformations() -> Vec<Transformation> {
    [
        (1, 1, 3),
        (3, 2, 4),
        (4, 3, 5),
        (5, 4, 8),
        (5, 6, 7),
        (8, 5, 6),
        (2, 6, 9),
        (9, 5, 10),
        (9, 1, 11),
        (4, 2, 9),
    ]
    .into_iter()
    .map(|(from, tool, to)| Transformation { from, tool, to })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_book_paths() {
        let book = RecipeBook::default();
        assert_eq!(book.len(), 12);

        let finals: Vec<Option<Piece>> = default_recipes().iter().map(|r| book.simulate(r)).collect();
        assert_eq!(
            finals,
            vec![
                Some(3),
                Some(4),
                Some(5),
                Some(8),
                Some(7),
                Some(6),
                Some(9),
                Some(9),
                Some(10),
                Some(10),
                Some(11),
                Some(11),
            ]
        );
    }

    #[test]
    fn test_find_for_prefers_first_match() {
        let book = RecipeBook::default();
        let recipe = book.find_for(9).unwrap();
        assert_eq!(recipe.initial_piece, 2);
        assert_eq!(recipe.steps, vec![Step { tool: 6, seconds: 15 }]);

        assert!(book.find_for(1).is_none());
        assert!(book.find_for(42).is_none());
    }

    #[test]
    fn test_simulate_stops_on_unknown_step() {
        let book = RecipeBook::default();
        assert_eq!(book.simulate(&Recipe::new(1, &[2], &[10])), None);
        assert_eq!(book.simulate(&Recipe::new(7, &[], &[])), Some(7));
    }

    #[test]
    fn test_payload_pads_arrays() {
        let payload = Recipe::new(1, &[1, 2, 3], &[20, 20, 45]).payload(6);
        assert_eq!(payload.entry_piece, 1);
        assert_eq!(payload.steps, 3);
        assert_eq!(payload.tools, vec![1, 2, 3, 0, 0, 0]);
        assert_eq!(payload.times_ms, vec![20_000, 20_000, 45_000, 0, 0, 0]);
    }

    #[test]
    fn test_payload_truncates_but_keeps_step_count() {
        let recipe = Recipe::new(1, &[1, 2, 3, 4, 5], &[20, 20, 45, 45, 30]);
        let payload = recipe.payload(3);
        assert_eq!(payload.steps, 5);
        assert_eq!(payload.tools, vec![1, 2, 3]);
        assert_eq!(payload.times_ms, vec![20_000, 20_000, 45_000]);
    }

    #[test]
    fn test_payload_step_count_saturates() {
        let count = i16::MAX as usize + 10;
        let recipe = Recipe::new(1, &vec![1; count], &vec![1; count]);
        let payload = recipe.payload(6);
        assert_eq!(payload.steps, i16::MAX);
        assert_eq!(payload.tools.len(), 6);
    }

    #[test]
    fn test_empty_book() {
        let book = RecipeBook::new(Vec::new(), &default_transformations());
        assert!(book.is_empty());
        assert!(book.find_for(3).is_none());
        assert!(!RecipeBook::default().is_empty());
    }
}
