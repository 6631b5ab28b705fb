/// Sibling ordering for menus
///
/// Menus sort by `order_num` ascending with unnumbered menus last, then by
/// `id` ascending. The id tie-break makes the order total, so the result does
/// not depend on input order.

use std::cmp::Ordering;

use crate::models::menu::Menu;

/// Compares two menus in display order
pub fn menu_order(a: &Menu, b: &Menu) -> Ordering {
    let by_order_num = match (a.order_num, b.order_num) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_order_num.then_with(|| a.id.cmp(&b.id))
}

/// Sorts menus in place into display order
pub fn sort_menus(menus: &mut [Menu]) {
    menus.sort_by(menu_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn menu(id: i64, order_num: Option<i32>) -> Menu {
        Menu {
            id,
            name: format!("m{id}"),
            icon: None,
            parent_id: None,
            order_num,
            path: None,
            component: None,
            menu_type: None,
            perms: None,
            create_time: Utc::now(),
            update_time: Utc::now(),
            remark: None,
        }
    }

    fn ids(menus: &[Menu]) -> Vec<i64> {
        menus.iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_nulls_sort_last() {
        let mut menus = vec![menu(1, None), menu(2, Some(100)), menu(3, Some(-5))];
        sort_menus(&mut menus);
        assert_eq!(ids(&menus), vec![3, 2, 1]);
    }

    #[test]
    fn test_equal_order_num_breaks_tie_by_id() {
        let mut menus = vec![menu(9, Some(1)), menu(4, Some(1)), menu(7, None), menu(2, None)];
        sort_menus(&mut menus);
        assert_eq!(ids(&menus), vec![4, 9, 2, 7]);
    }

    #[test]
    fn test_order_is_total() {
        let a = menu(1, Some(1));
        let b = menu(1, Some(1));
        assert_eq!(menu_order(&a, &b), Ordering::Equal);
        assert_eq!(menu_order(&menu(1, None), &menu(2, Some(0))), Ordering::Greater);
    }
}
