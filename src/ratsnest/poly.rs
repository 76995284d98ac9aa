//! Zone sub-polygon wrapper
//!
//! A copper zone is folded into the node graph one simple polygon at a time.
//! Each polygon is represented by a single node at its first outline point;
//! items found inside the outline are tied to that node with zero-weight
//! connections.

use super::links::{NodeId, RatsnestLinks};
use super::types::{BoundingBox, Point, ZoneId};

/// One simple sub-polygon of a zone
#[derive(Debug, Clone)]
pub struct ZonePolygon {
    outline: Vec<Point>,
    parent: ZoneId,
    bbox: BoundingBox,
    node: NodeId,
}

impl ZonePolygon {
    /// Wraps an outline run and registers its representative node in `links`.
    /// Returns None for outlines with fewer than two points.
    pub fn new(
        outline: &[Point],
        parent: ZoneId,
        bbox: BoundingBox,
        links: &mut RatsnestLinks,
    ) -> Option<Self> {
        if outline.len() < 2 {
            return None;
        }
        let node = links.add_node_at(outline[0]);
        Some(Self {
            outline: outline.to_vec(),
            parent,
            bbox,
            node,
        })
    }

    /// Representative node, coincident with the first outline point
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parent(&self) -> ZoneId {
        self.parent
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn outline(&self) -> &[Point] {
        &self.outline
    }

    /// Even-odd test of a node's position against the outline
    pub fn hit_test(&self, links: &RatsnestLinks, node: NodeId) -> bool {
        links
            .node(node)
            .is_some_and(|n| self.contains(&n.position()))
    }

    /// Even-odd ray crossing test with a bounding box pre-check
    pub fn contains(&self, p: &Point) -> bool {
        if !self.bbox.contains(p) {
            return false;
        }

        let px = p.x as f64;
        let py = p.y as f64;
        let mut inside = false;
        let mut j = self.outline.len() - 1;

        for i in 0..self.outline.len() {
            let (x0, y0) = (self.outline[j].x as f64, self.outline[j].y as f64);
            let (x1, y1) = (self.outline[i].x as f64, self.outline[i].y as f64);

            // Horizontal ray to +x crosses this edge
            if (y1 > py) != (y0 > py) {
                let x_intersect = (x0 - x1) * (py - y1) / (y0 - y1) + x1;
                if px < x_intersect {
                    inside = !inside;
                }
            }
            j = i;
        }

        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(links: &mut RatsnestLinks) -> ZonePolygon {
        let outline = [
            Point::new(0, 0),
            Point::new(100, 0),
            Point::new(100, 100),
            Point::new(0, 100),
        ];
        let bbox = BoundingBox::from_points(&outline).unwrap();
        ZonePolygon::new(&outline, ZoneId(1), bbox, links).unwrap()
    }

    #[test]
    fn test_representative_node_is_first_point() {
        let mut links = RatsnestLinks::new();
        let poly = square(&mut links);
        assert_eq!(links.node(poly.node()).unwrap().position(), Point::new(0, 0));
        assert_eq!(poly.parent(), ZoneId(1));
    }

    #[test]
    fn test_hit_test() {
        let mut links = RatsnestLinks::new();
        let poly = square(&mut links);
        let inside = links.add_node(50, 50);
        let outside = links.add_node(101, 50);
        assert!(poly.hit_test(&links, inside));
        assert!(!poly.hit_test(&links, outside));
    }

    #[test]
    fn test_concave_outline() {
        let mut links = RatsnestLinks::new();
        // U shape open at the top
        let outline = [
            Point::new(0, 0),
            Point::new(30, 0),
            Point::new(30, 30),
            Point::new(20, 30),
            Point::new(20, 10),
            Point::new(10, 10),
            Point::new(10, 30),
            Point::new(0, 30),
        ];
        let bbox = BoundingBox::from_points(&outline).unwrap();
        let poly = ZonePolygon::new(&outline, ZoneId(2), bbox, &mut links).unwrap();
        assert!(poly.contains(&Point::new(5, 20)));
        assert!(poly.contains(&Point::new(25, 20)));
        assert!(!poly.contains(&Point::new(15, 20)));
        assert!(poly.contains(&Point::new(15, 5)));
    }

    #[test]
    fn test_degenerate_outline_is_rejected() {
        let mut links = RatsnestLinks::new();
        let outline = [Point::new(3, 3)];
        let bbox = BoundingBox::from_points(&outline).unwrap();
        assert!(ZonePolygon::new(&outline, ZoneId(3), bbox, &mut links).is_none());
        assert_eq!(links.node_count(), 0);
    }
}
