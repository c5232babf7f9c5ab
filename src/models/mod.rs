pub mod workout;
pub mod nutrition;

pub use workout::{Exercise, NewExerciseEntry, NewWorkout, SetRow};
pub use nutrition::{FoodEntry, NewFoodEntry};
