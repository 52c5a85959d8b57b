use sea_orm::{
    ColumnTrait, EntityTrait, Order, QueryOrder, Select,
    sea_query::{Expr, NullOrdering, OrderedStatement as _},
};

pub trait OrderByNullsLast {
    /// `ORDER BY col DESC NULLS LAST`.
    fn order_by_desc_nulls_last<C: ColumnTrait>(self, col: C) -> Self;
}

impl<E> OrderByNullsLast for Select<E>
where
    E: EntityTrait,
{
    fn order_by_desc_nulls_last<C: ColumnTrait>(mut self, col: C) -> Self {
        QueryOrder::query(&mut self).order_by_expr_with_nulls(
            Expr::col((col.entity_name(), col)).into(),
            Order::Desc,
            NullOrdering::Last,
        );
        self
    }
}
