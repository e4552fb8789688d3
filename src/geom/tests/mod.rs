mod test_extrusion_basic;
mod test_spline_basic;
