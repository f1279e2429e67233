pub mod canvas_service;
pub mod chart_service;
pub mod plot_service;
pub mod report_service;
