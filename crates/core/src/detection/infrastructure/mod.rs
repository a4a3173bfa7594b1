pub mod mesh_topology;
pub mod onnx_blazeface_locator;
pub mod onnx_face_mesh_detector;
pub mod tensor_input;
