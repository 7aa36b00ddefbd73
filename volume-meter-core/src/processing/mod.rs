pub mod level_detector;
