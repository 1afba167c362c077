mod nested_propagation_test;
mod policy_matrix_test;
