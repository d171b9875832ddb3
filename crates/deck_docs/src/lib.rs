// Chart selection and presentation generation (PPTX with embedded charts)

pub mod chart;
pub mod chart_select;
pub mod chart_workbook;
pub mod pptx;

pub use chart::{ChartData, ChartFrame, Legend, LegendPosition, SlideChart, add_chart_to_slide};
pub use chart_select::{
    CategoryLabel, ChartDecision, ChartKind, ChartRequest, ChartSeries, DataShape, DataValue,
    determine_chart_type,
};
pub use pptx::{PptxSlide, generate_pptx, write_pptx};
