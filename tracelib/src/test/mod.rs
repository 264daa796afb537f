mod eval_tests;
mod program_tests;
