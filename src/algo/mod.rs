pub mod isolation_forest;
pub mod lstm;
pub mod var;

// Re-exports for convenience
pub use isolation_forest::{IsolationForest, IsolationTree, TreeNode};
pub use lstm::{Activation, DenseLayer, LstmLayer, LstmRegressor};
pub use var::VarModel;
