pub mod recognizer;
