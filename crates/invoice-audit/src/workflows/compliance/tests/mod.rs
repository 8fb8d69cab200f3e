mod common;
mod explainer;
