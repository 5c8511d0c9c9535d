use std::fmt;

use serde::{Deserialize, Serialize};

/// A dashboard element that can be shown or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementId {
    DataTable,
    TotalTippers,
    TotalBill,
    AverageTipPercentage,
    AverageBill,
    Plot,
}

/// Widgets shown by "show everything", in display order.
pub const WIDGETS: [ElementId; 5] = [
    ElementId::DataTable,
    ElementId::TotalTippers,
    ElementId::TotalBill,
    ElementId::AverageTipPercentage,
    ElementId::AverageBill,
];

/// The value boxes, in display order.
pub const VALUE_BOXES: [ElementId; 4] = [
    ElementId::TotalTippers,
    ElementId::TotalBill,
    ElementId::AverageTipPercentage,
    ElementId::AverageBill,
];

impl ElementId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataTable => "data_table",
            Self::TotalTippers => "total_tippers",
            Self::TotalBill => "total_bill",
            Self::AverageTipPercentage => "average_tip_percentage",
            Self::AverageBill => "average_bill",
            Self::Plot => "plot",
        }
    }

    /// Name used in chat phrases, e.g. `show average bill`.
    #[must_use]
    pub fn phrase(self) -> &'static str {
        match self {
            Self::DataTable => "data table",
            Self::TotalTippers => "total tippers",
            Self::TotalBill => "total bill",
            Self::AverageTipPercentage => "average tip percentage",
            Self::AverageBill => "average bill",
            Self::Plot => "plot",
        }
    }

    /// Heading shown above the element.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::DataTable => "Data Table",
            Self::TotalTippers => "Total tippers",
            Self::TotalBill => "Total bill",
            Self::AverageTipPercentage => "Average tip percentage",
            Self::AverageBill => "Average bill",
            Self::Plot => "Visualization",
        }
    }

    /// Map a name from a `hide elements:` list. Only widgets are addressable
    /// this way; the plot has its own `hide plot` phrase.
    #[must_use]
    pub fn from_phrase(name: &str) -> Option<Self> {
        let name = name.trim();
        WIDGETS.into_iter().find(|id| id.phrase() == name)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of visible elements, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRegistry {
    visible: Vec<ElementId>,
}

impl ElementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the element was not visible before.
    pub fn add(&mut self, id: ElementId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.visible.push(id);
        true
    }

    /// Returns `true` when the element was visible before.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let before = self.visible.len();
        self.visible.retain(|existing| *existing != id);
        self.visible.len() != before
    }

    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.visible.contains(&id)
    }

    /// Hide everything; returns what was visible, in insertion order.
    pub fn clear(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.visible)
    }

    #[must_use]
    pub fn all_ids(&self) -> &[ElementId] {
        &self.visible
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
