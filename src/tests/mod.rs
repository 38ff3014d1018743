// Test modules for igd-gateway
// One module per component, sharing the fixtures in `helpers`

mod helpers;
