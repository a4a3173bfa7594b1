pub mod cpu_landmark_renderer;
